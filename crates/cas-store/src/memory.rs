use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use cas_types::{ContentAddress, ObjectMetadata};
use tokio::io::AsyncRead;

use crate::error::{StoreError, StoreResult};
use crate::object::ObjectHandle;
use crate::stream::copy_hashed;
use crate::traits::ObjectStore;

struct MemoryObject {
    data: Bytes,
    modified: SystemTime,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock`;
/// publishing is the map insert under the write lock, so the dedup check and
/// the publish are one atomic step. Uploads are still hashed incrementally
/// as they are read.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ContentAddress, MemoryObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.data.len() as u64)
            .sum()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn store(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected: Option<ContentAddress>,
    ) -> StoreResult<ObjectMetadata> {
        let mut staged = Vec::new();
        let (address, length) = copy_hashed(reader, &mut staged).await?;
        let metadata = ObjectMetadata::new(address, length);

        if let Some(expected) = expected {
            if expected != address {
                return Err(StoreError::HashMismatch {
                    expected,
                    computed: address,
                });
            }
        }

        let mut map = self.objects.write().expect("lock poisoned");
        match map.entry(address) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(metadata)),
            Entry::Vacant(slot) => {
                slot.insert(MemoryObject {
                    data: Bytes::from(staged),
                    modified: SystemTime::now(),
                });
                Ok(metadata)
            }
        }
    }

    async fn open(&self, address: &ContentAddress) -> StoreResult<ObjectHandle> {
        let map = self.objects.read().expect("lock poisoned");
        let obj = map.get(address).ok_or(StoreError::NotFound(*address))?;
        Ok(ObjectHandle::new(
            *address,
            obj.data.len() as u64,
            obj.modified,
            Cursor::new(obj.data.clone()),
        ))
    }

    async fn delete(&self, address: &ContentAddress) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(address)
            .map(|_| ())
            .ok_or(StoreError::NotFound(*address))
    }

    async fn exists(&self, address: &ContentAddress) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(address))
    }

    async fn list(&self) -> StoreResult<Vec<ContentAddress>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<ContentAddress> = map.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
