//! Message Data Structure
//!
//! This module defines the `Message` type - the unit of data submitted to the
//! broker in a batch.
//!
//! ## Structure
//! Each message contains:
//! - **key**: SHA-256 digest of the value, computed at batch-build time.
//!   Content-derived keys mean identical payloads always map to the same
//!   key, which the broker can use for partition affinity and dedup.
//! - **value**: the payload itself (arbitrary bytes)
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for zero-copy operations (cloning a payload into a
//!   message bumps a refcount, it does not copy the bytes)
//! - Implements `Serialize`/`Deserialize` for diagnostics and test capture
//! - The key is always present; callers that do not care about it simply
//!   ignore it

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A keyed payload ready for publication to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// SHA-256 digest of `value`
    pub key: Bytes,

    /// Payload bytes
    pub value: Bytes,
}

impl Message {
    /// Build a message from a payload, deriving the key from its content.
    ///
    /// Two payloads with identical bytes produce identical keys; payloads
    /// differing in any byte produce different keys (digest collisions are
    /// not a practical concern at 256 bits).
    pub fn keyed(value: Bytes) -> Self {
        let key = Bytes::copy_from_slice(&Sha256::digest(&value));
        Self { key, value }
    }

    /// Total size of key plus value in bytes.
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len()
    }
}
