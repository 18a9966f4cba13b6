use cas_types::{ContentAddress, ObjectMetadata, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A client-supplied address is not 32 hex characters.
    #[error("malformed address: {0}")]
    MalformedAddress(#[from] TypeError),

    /// The declared address does not match the digest of the uploaded bytes.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        expected: ContentAddress,
        computed: ContentAddress,
    },

    /// An object with this content is already stored. Carries the metadata
    /// of the rejected write, which describes the existing object too.
    #[error("object already exists: {}", .0.address)]
    AlreadyExists(ObjectMetadata),

    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ContentAddress),

    /// Stored bytes no longer hash to their address.
    #[error("corrupt object {address}: content hashes to {computed}")]
    Corrupt {
        address: ContentAddress,
        computed: ContentAddress,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Map an I/O error on an address-keyed path, turning `ENOENT` into
    /// [`StoreError::NotFound`].
    pub(crate) fn from_io(address: &ContentAddress, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(*address)
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
