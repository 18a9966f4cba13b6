use async_trait::async_trait;
use cas_types::{ContentAddress, ObjectMetadata};
use tokio::io::AsyncRead;

use crate::error::StoreResult;
use crate::object::ObjectHandle;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - An object is only ever visible under the digest of its own bytes.
/// - Publishing is a single indivisible step: a failed or cancelled `store`
///   leaves nothing visible at any address.
/// - Objects are never overwritten. Storing content that is already present
///   fails with [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists).
/// - Hashing is incremental; uploads are never buffered just to be hashed.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream `reader` into the store and return the new object's metadata.
    ///
    /// If `expected` is given and does not match the computed digest the
    /// upload is discarded with `HashMismatch`.
    async fn store(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected: Option<ContentAddress>,
    ) -> StoreResult<ObjectMetadata>;

    /// Open an object for reading. Does not re-hash it.
    async fn open(&self, address: &ContentAddress) -> StoreResult<ObjectHandle>;

    /// Delete an object. Fails with `NotFound` if it does not exist.
    async fn delete(&self, address: &ContentAddress) -> StoreResult<()>;

    /// Check whether an object exists in the store.
    async fn exists(&self, address: &ContentAddress) -> StoreResult<bool>;

    /// Addresses of every stored object, sorted.
    async fn list(&self) -> StoreResult<Vec<ContentAddress>>;

    /// Re-hash an object and fail with `Corrupt` if it no longer matches its
    /// address.
    async fn verify(&self, address: &ContentAddress) -> StoreResult<ObjectMetadata> {
        let mut handle = self.open(address).await?;
        handle.verify().await?;
        Ok(handle.metadata())
    }
}
