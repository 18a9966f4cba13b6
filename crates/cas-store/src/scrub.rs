use cas_types::ContentAddress;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// An object whose bytes no longer hash to its address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorruptObject {
    pub address: ContentAddress,
    pub computed: ContentAddress,
}

/// Outcome of a full-store verification pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrubReport {
    pub checked: u64,
    pub healthy: u64,
    pub bytes_verified: u64,
    pub corrupt: Vec<CorruptObject>,
    /// Objects deleted between listing and verification.
    pub vanished: u64,
}

impl ScrubReport {
    pub fn is_clean(&self) -> bool {
        self.corrupt.is_empty()
    }
}

/// Run the verification pass over every object in `store`.
///
/// Corrupt objects are reported, not removed. Any error other than
/// `NotFound`/`Corrupt` aborts the scrub.
pub async fn scrub(store: &dyn ObjectStore) -> StoreResult<ScrubReport> {
    let mut report = ScrubReport::default();
    for address in store.list().await? {
        report.checked += 1;
        let mut handle = match store.open(&address).await {
            Ok(handle) => handle,
            Err(StoreError::NotFound(_)) => {
                report.vanished += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        match handle.verify().await {
            Ok(()) => {
                report.healthy += 1;
                report.bytes_verified += handle.len();
            }
            Err(StoreError::Corrupt { address, computed }) => {
                warn!(address = %address, computed = %computed, "corrupt object");
                report.corrupt.push(CorruptObject { address, computed });
            }
            Err(e) => return Err(e),
        }
    }
    debug!(
        checked = report.checked,
        corrupt = report.corrupt.len(),
        "scrub finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryObjectStore, LocalFsStore};
    use cas_crypto::ContentHasher;

    #[tokio::test]
    async fn clean_store() {
        let store = InMemoryObjectStore::new();
        store.store(&mut &b"one"[..], None).await.unwrap();
        store.store(&mut &b"three"[..], None).await.unwrap();

        let report = scrub(&store).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.checked, 2);
        assert_eq!(report.healthy, 2);
        assert_eq!(report.bytes_verified, 8);
    }

    #[tokio::test]
    async fn empty_store() {
        let report = scrub(&InMemoryObjectStore::new()).await.unwrap();
        assert_eq!(report, ScrubReport::default());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn finds_tampered_object_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::open(dir.path()).await.unwrap();
        let good = store.store(&mut &b"good"[..], None).await.unwrap();
        let bad = store.store(&mut &b"bad"[..], None).await.unwrap();
        std::fs::write(store.layout().object_path(&bad.address), b"evil").unwrap();

        let report = scrub(&store).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.checked, 2);
        assert_eq!(report.healthy, 1);
        assert_eq!(
            report.corrupt,
            vec![CorruptObject {
                address: bad.address,
                computed: ContentHasher::digest(b"evil"),
            }]
        );
        assert!(store.verify(&good.address).await.is_ok());
    }

    /// Lists one address more than it can open, as if it had been deleted
    /// right after the listing.
    struct DeletedAfterListing {
        inner: InMemoryObjectStore,
        gone: ContentAddress,
    }

    #[async_trait::async_trait]
    impl ObjectStore for DeletedAfterListing {
        async fn store(
            &self,
            reader: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
            expected: Option<ContentAddress>,
        ) -> StoreResult<cas_types::ObjectMetadata> {
            self.inner.store(reader, expected).await
        }

        async fn open(&self, address: &ContentAddress) -> StoreResult<crate::ObjectHandle> {
            self.inner.open(address).await
        }

        async fn delete(&self, address: &ContentAddress) -> StoreResult<()> {
            self.inner.delete(address).await
        }

        async fn exists(&self, address: &ContentAddress) -> StoreResult<bool> {
            self.inner.exists(address).await
        }

        async fn list(&self) -> StoreResult<Vec<ContentAddress>> {
            let mut addresses = self.inner.list().await?;
            addresses.push(self.gone);
            Ok(addresses)
        }
    }

    #[tokio::test]
    async fn object_deleted_mid_scrub_counts_as_vanished() {
        let store = DeletedAfterListing {
            inner: InMemoryObjectStore::new(),
            gone: ContentHasher::digest(b"deleted"),
        };
        store.store(&mut &b"kept"[..], None).await.unwrap();

        let report = scrub(&store).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.vanished, 1);
        assert!(report.is_clean());
    }
}
