use serde::{Deserialize, Serialize};

use crate::address::ContentAddress;

/// Description of a stored object, as returned by a successful store.
///
/// Not persisted on its own: everything here can be re-derived from the
/// stored bytes. On the wire it is `{"MD5": "<hex>", "Length": <n>}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Content address of the object.
    #[serde(rename = "MD5")]
    pub address: ContentAddress,
    /// Size of the object in bytes.
    #[serde(rename = "Length")]
    pub length: u64,
}

impl ObjectMetadata {
    pub fn new(address: ContentAddress, length: u64) -> Self {
        Self { address, length }
    }
}
