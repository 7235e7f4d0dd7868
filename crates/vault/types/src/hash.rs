//! Content hashes identifying artifact bytes.
//!
//! Hashes are produced by the caller's tooling. This crate only carries them
//! and converts to and from their hex text form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of every content hash, in bytes.
pub const CONTENT_HASH_LEN: usize = 32;

/// Fixed-length digest identifying the content of one script version.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

/// Errors parsing a content hash from text or bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentHashError {
    #[error("content hash must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("content hash is not valid hex: {0}")]
    InvalidHex(String),
}

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; CONTENT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.0
    }

    /// Build from a slice, rejecting anything that is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContentHashError> {
        let array: [u8; CONTENT_HASH_LEN] =
            bytes.try_into().map_err(|_| ContentHashError::InvalidLength {
                expected: CONTENT_HASH_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Lowercase hex, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse hex text. A leading `0x` is accepted.
    pub fn from_hex(text: &str) -> Result<Self, ContentHashError> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let bytes =
            hex::decode(digits).map_err(|error| ContentHashError::InvalidHex(error.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; CONTENT_HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; CONTENT_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}
