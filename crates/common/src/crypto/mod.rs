//! Cryptographic primitives for the drive
//!
//! - **Tenant keys**: one random 256-bit [`UserKey`] per tenant, generated at signup
//! - **Blob encryption**: AES-256-CTR with a fresh IV per blob, appended to the
//!   ciphertext (`ciphertext || iv`)
//! - **Content addressing**: SHA-256 over `leaf_name || user_key` (see [`crate::address`])
//!
//! Blobs carry no authentication tag; integrity of the tree is the relational
//! store's job, confidentiality of the bytes is this module's.

mod cipher;
mod key;

pub use cipher::{generate_iv, plaintext_len, BlobCipher, Iv, DEFAULT_CHUNK_SIZE, IV_SIZE};
pub use key::{UserKey, USER_KEY_SIZE};
