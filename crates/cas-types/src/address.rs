use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TypeError;

/// Size of a content address in bytes (a 128-bit MD5 digest).
pub const ADDRESS_LEN: usize = 16;

/// Length of the canonical hex form.
pub const ADDRESS_HEX_LEN: usize = ADDRESS_LEN * 2;

/// Content address of a stored object.
///
/// A `ContentAddress` is the MD5 digest of an object's bytes. Identical
/// content always produces the same address, which is what makes objects
/// deduplicatable and verifiable. The canonical textual form is 32 lowercase
/// hex characters; that string is also the serialized form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentAddress([u8; ADDRESS_LEN]);

impl ContentAddress {
    /// Wrap a finalized digest.
    pub const fn from_digest(digest: [u8; ADDRESS_LEN]) -> Self {
        Self(digest)
    }

    /// The raw 16-byte digest.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Canonical lowercase hex representation (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Shard prefix: the first two hex characters of the canonical form.
    pub fn shard(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Parse from a hex string.
    ///
    /// Upper-case digits are accepted; the canonical output of
    /// [`to_hex`](Self::to_hex) is always lower-case.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(TypeError::InvalidLength {
                expected: ADDRESS_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl FromStr for ContentAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.short_hex())
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; ADDRESS_LEN]> for ContentAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ContentAddress> for [u8; ADDRESS_LEN] {
    fn from(address: ContentAddress) -> Self {
        address.0
    }
}

impl Serialize for ContentAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl Visitor<'_> for HexVisitor {
            type Value = ContentAddress;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a {ADDRESS_HEX_LEN}-character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                ContentAddress::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
