//! Cipher provider trait definitions
//!
//! A provider resolves an algorithm name into key material and reusable cipher
//! handles. The encryptors never touch a concrete primitive directly.

use thiserror::Error;

use super::{DerivedKey, SecretPassword};

/// Failures reported by a cipher provider.
///
/// These never leave the binary encryptor; they are translated into
/// [`PbeError`](crate::PbeError) kinds that carry no cause.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("no such algorithm: {0}")]
    NoSuchAlgorithm(String),

    #[error("no such provider: {0}")]
    NoSuchProvider(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("cipher not initialized")]
    NotInitialized,

    #[error("cipher operation failed")]
    Failed,
}

impl CipherError {
    /// Whether this failure was caused by a rejected key size
    pub fn is_key_size(&self) -> bool {
        matches!(self, CipherError::InvalidKey(message)
            if message.to_ascii_uppercase().contains("KEY SIZE"))
    }
}

/// Direction a cipher handle is initialized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}

/// Per-operation parameters: salt plus iteration count
#[derive(Debug, Clone, Copy)]
pub struct PbeParameters<'a> {
    pub salt: &'a [u8],
    pub iterations: u32,
}

/// A stateful cipher handle.
///
/// Each call is `init` followed by `do_final`; callers sharing a handle must
/// serialize that pair.
pub trait PbeCipher: Send {
    /// Block size in bytes, or 0 when this is not a padded block cipher
    fn block_size(&self) -> usize;

    /// Prepare the handle for one transform
    fn init(
        &mut self,
        mode: CipherMode,
        key: &DerivedKey,
        params: &PbeParameters<'_>,
    ) -> Result<(), CipherError>;

    /// Run the transform prepared by the last `init` and reset the handle
    fn do_final(&mut self, input: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// Trait for cipher providers
pub trait CipherProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Turn a password into key material for `algorithm`
    fn derive_key(
        &self,
        algorithm: &str,
        password: &SecretPassword,
    ) -> Result<DerivedKey, CipherError>;

    /// Create a fresh cipher handle for `algorithm`
    fn cipher(&self, algorithm: &str) -> Result<Box<dyn PbeCipher>, CipherError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_size_detection() {
        assert!(CipherError::InvalidKey("Illegal key size".into()).is_key_size());
        assert!(CipherError::InvalidKey("invalid KEY SIZE: 7 bytes".into()).is_key_size());
        assert!(!CipherError::InvalidKey("wrong key".into()).is_key_size());
        assert!(!CipherError::Failed.is_key_size());
    }
}
