//! Salt generators
//!
//! A generator either embeds its salt in the clear in front of each
//! ciphertext, or must hand out the same bytes again on decryption.

use rand::RngCore;

use crate::error::{PbeError, Result};

/// Trait for salt generators
pub trait SaltGenerator: Send + Sync {
    /// Produce `len` salt bytes
    fn generate(&self, len: usize) -> Result<Vec<u8>>;

    /// Whether the salt is prepended unencrypted to every ciphertext
    fn embeds_plaintext(&self) -> bool;
}

/// Fresh random salt from the operating system RNG for every call
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureSalt;

impl SaltGenerator for SecureSalt {
    fn generate(&self, len: usize) -> Result<Vec<u8>> {
        let mut salt = vec![0u8; len];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Ok(salt)
    }

    fn embeds_plaintext(&self) -> bool {
        true
    }
}

/// All-zero salt
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroSalt;

impl SaltGenerator for ZeroSalt {
    fn generate(&self, len: usize) -> Result<Vec<u8>> {
        Ok(vec![0u8; len])
    }

    fn embeds_plaintext(&self) -> bool {
        false
    }
}

/// Caller-supplied salt, truncated to the requested length
#[derive(Clone, PartialEq, Eq)]
pub struct FixedSalt {
    salt: Vec<u8>,
}

impl FixedSalt {
    pub fn from_bytes(salt: impl Into<Vec<u8>>) -> Self {
        Self { salt: salt.into() }
    }

    /// Use the UTF-8 bytes of `text`
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn from_hex(encoded: &str) -> Result<Self> {
        let salt = hex::decode(encoded)
            .map_err(|e| PbeError::config(format!("Invalid salt hex: {}", e)))?;
        Ok(Self { salt })
    }

    pub fn len(&self) -> usize {
        self.salt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.salt.is_empty()
    }
}

impl std::fmt::Debug for FixedSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedSalt")
            .field("len", &self.salt.len())
            .finish()
    }
}

impl SaltGenerator for FixedSalt {
    fn generate(&self, len: usize) -> Result<Vec<u8>> {
        if len > self.salt.len() {
            return Err(PbeError::config(format!(
                "Requested salt of {} bytes is larger than the {} fixed bytes available",
                len,
                self.salt.len()
            )));
        }
        Ok(self.salt[..len].to_vec())
    }

    fn embeds_plaintext(&self) -> bool {
        false
    }
}
