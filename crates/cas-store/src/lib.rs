//! Content-addressed object storage engine.
//!
//! Objects are opaque byte streams identified by the MD5 digest of their
//! contents. The engine streams an upload into a private staging file while
//! hashing it, syncs it, and only then publishes it under its address with a
//! single atomic link. Identical content is stored once; a second upload of
//! the same bytes is reported as [`StoreError::AlreadyExists`].
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LocalFsStore`] -- sharded directory tree on a local filesystem
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once published; there is no overwrite.
//! 2. Stage, hash, sync, then link. Nothing partial is ever addressable.
//! 3. Staging files are removed on every exit path, including cancellation.
//! 4. No in-memory index: every call re-derives state from the backend.
//! 5. Corruption is detected by an explicit verification pass, never implicitly.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod layout;
pub mod local;
pub mod memory;
pub mod object;
pub mod scrub;
pub mod stream;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use layout::{ShardedLayout, STAGING_PREFIX};
pub use local::{LocalFsStore, StoreStats};
pub use memory::InMemoryObjectStore;
pub use object::{ObjectBody, ObjectHandle};
pub use scrub::{scrub, CorruptObject, ScrubReport};
pub use traits::ObjectStore;
