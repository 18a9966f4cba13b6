use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use cas_types::{ContentAddress, ObjectMetadata};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::layout::ShardedLayout;
use crate::object::ObjectHandle;
use crate::stream::copy_hashed;
use crate::traits::ObjectStore;

/// Object store on a local filesystem.
///
/// Objects live at `<root>/<shard>/<hex>` (see [`ShardedLayout`]). Uploads are
/// staged in a temporary file inside the root, hashed while they are written,
/// fsynced, and then published with a single hard link. Nothing is cached in
/// memory: every call re-reads the filesystem.
#[derive(Clone, Debug)]
pub struct LocalFsStore {
    layout: ShardedLayout,
}

/// Counts gathered by walking the store root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub objects: u64,
    pub bytes: u64,
    pub staging_files: u64,
}

impl LocalFsStore {
    /// Open a store rooted at `root`, creating the directory (mode 0700) if
    /// needed.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        create_private_dir(root).await?;
        info!(path = %root.display(), "opened object store");
        Ok(Self {
            layout: ShardedLayout::new(root),
        })
    }

    pub fn layout(&self) -> &ShardedLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Walk the root and count objects, bytes and leftover staging files.
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let layout = self.layout.clone();
        run_blocking(move || {
            let mut stats = StoreStats::default();
            for entry in WalkDir::new(layout.root()).min_depth(1).max_depth(2) {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if entry.depth() == 1 {
                    if is_staging_entry(&entry) {
                        stats.staging_files += 1;
                    }
                } else if layout.address_for(entry.path()).is_some() {
                    stats.objects += 1;
                    stats.bytes += entry.metadata().map_err(io::Error::from)?.len();
                }
            }
            Ok(stats)
        })
        .await
    }

    /// Remove staging files older than `older_than`.
    ///
    /// Staging files are normally removed by the store that created them; the
    /// only leftovers come from crashes. Younger files may belong to uploads
    /// still in flight and are kept. Returns the number of files removed.
    pub async fn sweep_staging(&self, older_than: Duration) -> StoreResult<usize> {
        let root = self.layout.root().to_path_buf();
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !ShardedLayout::is_staging_name(name) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }
            let age = now
                .duration_since(meta.modified()?)
                .unwrap_or(Duration::ZERO);
            if age < older_than {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!(file = name, age_secs = age.as_secs(), "removed stale staging file");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed > 0 {
            info!(removed, "swept orphaned staging files");
        }
        Ok(removed)
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn store(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        expected: Option<ContentAddress>,
    ) -> StoreResult<ObjectMetadata> {
        // Dropping `staging` deletes the file, which covers every early
        // return below as well as cancellation of this future.
        let layout = self.layout.clone();
        let staging = run_blocking(move || Ok(layout.create_staging()?)).await?;
        let (address, length) = {
            let mut file = fs::File::from_std(staging.as_file().try_clone()?);
            let copied = copy_hashed(reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            copied
        };
        let metadata = ObjectMetadata::new(address, length);
        debug!(address = %address, length, staging = %staging.path().display(), "staged upload");

        if let Some(expected) = expected {
            if expected != address {
                debug!(expected = %expected, computed = %address, "declared digest mismatch");
                return Err(StoreError::HashMismatch {
                    expected,
                    computed: address,
                });
            }
        }

        let path = self.layout.object_path(&address);
        if fs::try_exists(&path).await? {
            debug!(address = %address, "object already stored");
            return Err(StoreError::AlreadyExists(metadata));
        }

        let shard = self.layout.shard_dir(&address);
        create_private_dir(&shard).await?;
        match fs::hard_link(staging.path(), &path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(address = %address, "lost publish race to a concurrent store");
                return Err(StoreError::AlreadyExists(metadata));
            }
            Err(e) => return Err(e.into()),
        }

        // The object is visible from here on; housekeeping failures are
        // reported but cannot un-publish it.
        if let Err(e) = sync_dir(&shard).await {
            warn!(dir = %shard.display(), error = %e, "failed to sync shard directory");
        }
        if let Err(e) = run_blocking(move || Ok(staging.close()?)).await {
            warn!(address = %address, error = %e, "failed to remove staging file");
        }

        info!(address = %address, length, "stored object");
        Ok(metadata)
    }

    async fn open(&self, address: &ContentAddress) -> StoreResult<ObjectHandle> {
        let path = self.layout.object_path(address);
        let file = fs::File::open(&path)
            .await
            .map_err(|e| StoreError::from_io(address, e))?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(*address));
        }
        Ok(ObjectHandle::new(*address, meta.len(), meta.modified()?, file))
    }

    async fn delete(&self, address: &ContentAddress) -> StoreResult<()> {
        let path = self.layout.object_path(address);
        fs::remove_file(&path)
            .await
            .map_err(|e| StoreError::from_io(address, e))?;
        info!(address = %address, "deleted object");
        Ok(())
    }

    async fn exists(&self, address: &ContentAddress) -> StoreResult<bool> {
        Ok(fs::try_exists(self.layout.object_path(address)).await?)
    }

    async fn list(&self) -> StoreResult<Vec<ContentAddress>> {
        let layout = self.layout.clone();
        run_blocking(move || {
            let mut addresses = Vec::new();
            for entry in WalkDir::new(layout.root()).min_depth(2).max_depth(2) {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                match layout.address_for(entry.path()) {
                    Some(address) => addresses.push(address),
                    None => warn!(path = %entry.path().display(), "skipping unexpected file in store"),
                }
            }
            addresses.sort();
            Ok(addresses)
        })
        .await
    }
}

fn is_staging_entry(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(ShardedLayout::is_staging_name)
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))?
}

async fn create_private_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder.create(path).await
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
