use cas_types::{ContentAddress, ADDRESS_LEN};
use md5::{Digest, Md5};

/// Incremental content hasher.
///
/// Feed bytes with [`update`](Self::update) as they stream past, then call
/// [`finalize`](Self::finalize) to obtain the object's address. The hasher
/// holds a fixed amount of state regardless of how much data it has seen.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Md5,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    /// Absorb the next chunk of the stream.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consume the hasher and produce the content address.
    pub fn finalize(self) -> ContentAddress {
        let mut digest = [0u8; ADDRESS_LEN];
        digest.copy_from_slice(&self.inner.finalize());
        ContentAddress::from_digest(digest)
    }

    /// One-shot digest of an in-memory buffer.
    pub fn digest(data: &[u8]) -> ContentAddress {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").finish_non_exhaustive()
    }
}
