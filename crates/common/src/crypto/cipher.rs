//! AES-256-CTR keystream used for blob contents
//!
//! A blob is laid out as `ciphertext || iv` with no header or length prefix.
//! The counter is the full 16-byte IV incremented big-endian, so the keystream
//! is position-dependent only: encrypting a file in chunks of any size yields
//! the same bytes as encrypting it in one go.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};

use super::key::UserKey;
use crate::error::{DriveError, Result};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Size of the trailing IV in bytes (one AES block)
pub const IV_SIZE: usize = 16;
/// Default chunk size for streaming operations
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Initialization vector stored at the tail of each blob
pub type Iv = [u8; IV_SIZE];

/// Generate a fresh random IV. Every blob gets its own.
pub fn generate_iv() -> Result<Iv> {
    let mut iv = [0u8; IV_SIZE];
    getrandom::getrandom(&mut iv).map_err(|e| DriveError::Entropy(e.to_string()))?;
    Ok(iv)
}

/// Number of plaintext bytes carried by a blob of `blob_len` bytes.
///
/// `None` if the blob cannot even hold its IV.
pub fn plaintext_len(blob_len: usize) -> Option<usize> {
    blob_len.checked_sub(IV_SIZE)
}

/// Stateful keystream for one blob, in either direction.
pub struct BlobCipher(Aes256Ctr);

impl BlobCipher {
    pub fn new(key: &UserKey, iv: &Iv) -> Self {
        let key: [u8; 32] = **key;
        Self(Aes256Ctr::new(&key.into(), &(*iv).into()))
    }

    /// XOR the next `buf.len()` keystream bytes into `buf`.
    ///
    /// Encryption and decryption are the same operation.
    pub fn apply(&mut self, buf: &mut [u8]) {
        self.0.apply_keystream(buf);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_answer() {
        // NIST SP 800-38A F.5.5, CTR-AES256, first block
        let key = hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap();
        let iv: Iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")
            .unwrap()
            .try_into()
            .unwrap();
        let mut block = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let key = UserKey::from_slice(&key).unwrap();
        BlobCipher::new(&key, &iv).apply(&mut block);

        assert_eq!(hex::encode(block), "601ec313775789a5b7a7f504bbf3d228");
    }

    #[test]
    fn test_chunked_equals_one_shot() {
        let key = UserKey::generate().unwrap();
        let iv = generate_iv().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();

        let mut one_shot = data.clone();
        BlobCipher::new(&key, &iv).apply(&mut one_shot);

        // Odd chunk size so chunks straddle AES block boundaries
        let mut chunked = data.clone();
        let mut cipher = BlobCipher::new(&key, &iv);
        for chunk in chunked.chunks_mut(7) {
            cipher.apply(chunk);
        }

        assert_eq!(one_shot, chunked);
        assert_ne!(one_shot, data);

        let mut back = one_shot;
        BlobCipher::new(&key, &iv).apply(&mut back);
        assert_eq!(back, data);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        assert_ne!(generate_iv().unwrap(), generate_iv().unwrap());
    }

    #[test]
    fn test_plaintext_len() {
        assert_eq!(plaintext_len(IV_SIZE), Some(0));
        assert_eq!(plaintext_len(IV_SIZE + 10), Some(10));
        assert_eq!(plaintext_len(IV_SIZE - 1), None);
    }
}
