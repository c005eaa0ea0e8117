//! Per-tenant symmetric key
//!
//! Each tenant gets one `UserKey` at signup. It is never derived from a
//! password; it is random, stored base64-encoded in the tenant record and
//! handed to the drive read-only for addressing and encrypting that tenant's
//! files.

use std::fmt;
use std::ops::Deref;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{DriveError, Result};

/// Size of a user key in bytes (AES-256)
pub const USER_KEY_SIZE: usize = 32;

/// A 256-bit tenant key used both as the AES-256-CTR key for blob contents
/// and as the salt of the blob content address.
#[derive(PartialEq, Eq, Clone)]
pub struct UserKey([u8; USER_KEY_SIZE]);

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserKey(..)")
    }
}

impl Deref for UserKey {
    type Target = [u8; USER_KEY_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; USER_KEY_SIZE]> for UserKey {
    fn from(bytes: [u8; USER_KEY_SIZE]) -> Self {
        UserKey(bytes)
    }
}

impl UserKey {
    /// Generate a new random key from the OS entropy source
    pub fn generate() -> Result<Self> {
        let mut buff = [0; USER_KEY_SIZE];
        getrandom::getrandom(&mut buff).map_err(|e| DriveError::Entropy(e.to_string()))?;
        Ok(Self(buff))
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `USER_KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() != USER_KEY_SIZE {
            return Err(DriveError::InvalidArgument(format!(
                "invalid user key size, expected {}, got {}",
                USER_KEY_SIZE,
                data.len()
            )));
        }
        let mut buff = [0; USER_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Decode a key from its stored (standard base64) representation
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DriveError::InvalidArgument(format!("invalid user key encoding: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Encode the key for storage in the tenant record
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}
