//! Digest primitives for the content-addressed store.
//!
//! Wraps the RustCrypto MD5 implementation behind [`ContentHasher`], which
//! yields a [`cas_types::ContentAddress`]. Hashing is incremental so callers
//! can feed arbitrarily large streams without buffering them.

pub mod hasher;

pub use hasher::ContentHasher;
