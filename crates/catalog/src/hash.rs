//! Cache-key derivation for query options.
//!
//! Keys are a truncated SHA-256 over the `serde_json` serialization of the
//! options. This is a cache key, not an integrity check: two different
//! option sets colliding would make one answer the other's query. With
//! 128 bits that risk is accepted rather than guarded against.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Number of digest bytes kept in a key.
const KEY_BYTES: usize = 16;

/// Derives deterministic string keys from strings and serializable values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Create a hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hash a string into a hex key.
    #[must_use]
    pub fn hash_string(&self, input: &str) -> String {
        let digest = Sha256::digest(input.as_bytes());
        hex::encode(&digest[..KEY_BYTES])
    }

    /// Hash the canonical JSON form of `value`.
    ///
    /// Serialization is field-order sensitive: structs serialize in
    /// declaration order, so equal query values always produce equal keys.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized to JSON.
    pub fn hash_object<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let canonical = serde_json::to_string(value)?;
        Ok(self.hash_string(&canonical))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = ContentHasher::new();
        assert_eq!(hasher.hash_string("abc"), hasher.hash_string("abc"));
        assert_ne!(hasher.hash_string("abc"), hasher.hash_string("abd"));
        assert_eq!(hasher.hash_string("").len(), KEY_BYTES * 2);
    }

    #[test]
    fn test_equal_objects_share_a_key() {
        let hasher = ContentHasher::new();
        let a = hasher
            .hash_object(&json!({"categoryId": "c1", "config": {"sort": "asc"}}))
            .unwrap();
        let b = hasher
            .hash_object(&json!({"categoryId": "c1", "config": {"sort": "asc"}}))
            .unwrap();
        let c = hasher
            .hash_object(&json!({"categoryId": "c1", "config": {"sort": "desc"}}))
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
