//! Content addresses for blobs.
//!
//! A file's blob is named after a keyed digest of its *name*, not its bytes:
//! `sha256(leaf_name || user_key)` in lowercase hex. The address is stable
//! per (tenant, filename) and unguessable without the tenant key. Two files
//! with the same leaf name in different directories derive the same digest
//! and are told apart by a duplicate index suffix.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::crypto::UserKey;

/// Derive the hex content hash for a leaf name under a tenant key.
pub fn derive_blob_key(leaf_name: &[u8], key: &UserKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(leaf_name);
    hasher.update(key.bytes());
    hex::encode(hasher.finalize())
}

/// The on-disk identity of one blob: content hash plus duplicate index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobAddress {
    content_hash: String,
    duplicate_index: u32,
}

impl BlobAddress {
    pub fn new(content_hash: impl Into<String>, duplicate_index: u32) -> Self {
        Self {
            content_hash: content_hash.into(),
            duplicate_index,
        }
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn duplicate_index(&self) -> u32 {
        self.duplicate_index
    }

    /// Flat object name: `{hash}` for index 0, `{hash}{n}` otherwise.
    pub fn object_name(&self) -> String {
        if self.duplicate_index == 0 {
            self.content_hash.clone()
        } else {
            format!("{}{}", self.content_hash, self.duplicate_index)
        }
    }
}

impl fmt::Display for BlobAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_sha256_of_name_then_key() {
        let key = UserKey::from([0u8; 32]);
        let mut input = b"notes.txt".to_vec();
        input.extend_from_slice(&[0u8; 32]);
        let expected = hex::encode(Sha256::digest(&input));

        let derived = derive_blob_key(b"notes.txt", &key);
        assert_eq!(derived, expected);
        assert_eq!(derived.len(), 64);
        assert!(derived.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_is_keyed() {
        let a = UserKey::from([1u8; 32]);
        let b = UserKey::from([2u8; 32]);
        assert_eq!(
            derive_blob_key(b"report.pdf", &a),
            derive_blob_key(b"report.pdf", &a)
        );
        assert_ne!(
            derive_blob_key(b"report.pdf", &a),
            derive_blob_key(b"report.pdf", &b)
        );
        assert_ne!(
            derive_blob_key(b"report.pdf", &a),
            derive_blob_key(b"report.txt", &a)
        );
    }

    #[test]
    fn test_object_name_suffix() {
        assert_eq!(BlobAddress::new("abc", 0).object_name(), "abc");
        assert_eq!(BlobAddress::new("abc", 1).object_name(), "abc1");
        assert_eq!(BlobAddress::new("abc", 12).to_string(), "abc12");
    }
}
