//! Foundation types for the content-addressed store.
//!
//! Every other `cas` crate depends on `cas-types`.
//!
//! # Key Types
//!
//! - [`ContentAddress`]: 128-bit MD5 digest identifying an object's bytes
//! - [`ObjectMetadata`]: address and length of a stored object

pub mod address;
pub mod error;
pub mod metadata;

pub use address::{ContentAddress, ADDRESS_HEX_LEN, ADDRESS_LEN};
pub use error::TypeError;
pub use metadata::ObjectMetadata;
