use std::io;
use std::path::{Path, PathBuf};

use cas_types::ContentAddress;
use tempfile::NamedTempFile;

/// File-name prefix of staging files in the store root.
pub const STAGING_PREFIX: &str = "store-";

/// Two-level sharded directory layout.
///
/// ```text
/// <root>/
///   store-XXXXXX            staging files (never addressable)
///   5d/
///     5d41402abc4b2a76b9719d911017c592
/// ```
///
/// The two-character shard bounds each directory to 1/256th of the objects.
/// The layout is the whole naming scheme: there is no index or sidecar file.
#[derive(Clone, Debug)]
pub struct ShardedLayout {
    root: PathBuf,
}

impl ShardedLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every object whose address starts with the same shard.
    pub fn shard_dir(&self, address: &ContentAddress) -> PathBuf {
        self.root.join(address.shard())
    }

    /// Canonical path of an object.
    pub fn object_path(&self, address: &ContentAddress) -> PathBuf {
        self.shard_dir(address).join(address.to_hex())
    }

    /// Create a uniquely named staging file in the root.
    ///
    /// The file is removed when the returned guard is dropped.
    pub fn create_staging(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)
    }

    pub fn is_staging_name(name: &str) -> bool {
        name.starts_with(STAGING_PREFIX)
    }

    /// Inverse of [`object_path`](Self::object_path).
    ///
    /// Returns `None` for anything that is not a canonical object path under
    /// this root: wrong depth, non-hex or upper-case names, or a file sitting
    /// in the wrong shard.
    pub fn address_for(&self, path: &Path) -> Option<ContentAddress> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut parts = rel.components();
        let shard = parts.next()?.as_os_str().to_str()?;
        let name = parts.next()?.as_os_str().to_str()?;
        if parts.next().is_some() {
            return None;
        }
        let address = ContentAddress::from_hex(name).ok()?;
        (address.to_hex() == name && address.shard() == shard).then_some(address)
    }
}
