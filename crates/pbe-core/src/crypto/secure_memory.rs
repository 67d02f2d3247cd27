//! Secure memory handling with automatic zeroization

use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PbeError, Result};

/// Key material produced by a cipher provider - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    #[zeroize(skip)]
    algorithm: String,
    material: Vec<u8>,
}

impl DerivedKey {
    /// Wrap raw key material for the given algorithm
    pub fn new(algorithm: impl Into<String>, material: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            material,
        }
    }

    /// Algorithm this key was produced for
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Get the key material (use carefully - avoid copying)
    pub fn material(&self) -> &[u8] {
        &self.material
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &self.algorithm)
            .field("material", &"[REDACTED]")
            .finish()
    }
}

/// Password held by an encryptor until key derivation - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretPassword {
    value: String,
}

impl SecretPassword {
    /// Copy a password from text
    pub fn new(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(PbeError::config("password cannot be empty"));
        }
        Ok(Self {
            value: value.to_owned(),
        })
    }

    /// Copy a password from a caller-owned byte buffer.
    ///
    /// The buffer must hold UTF-8. The caller keeps responsibility for
    /// zeroing its own copy.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PbeError::config("password cannot be empty"));
        }
        match String::from_utf8(bytes.to_vec()) {
            Ok(value) => Ok(Self { value }),
            Err(e) => {
                let mut rejected = e.into_bytes();
                rejected.zeroize();
                Err(PbeError::config("password bytes are not valid UTF-8"))
            }
        }
    }

    /// Canonical composed (NFC) form of this password
    pub fn normalized(&self) -> SecretPassword {
        // NFC expands to at most three times the input; sized up front so
        // growth never leaves a copy behind
        let mut value = String::with_capacity(self.value.len() * 3);
        value.extend(self.value.nfc());
        SecretPassword { value }
    }

    /// Get the password (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for SecretPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPassword")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            SecretPassword::new(""),
            Err(PbeError::Configuration(_))
        ));
        assert!(matches!(
            SecretPassword::from_bytes(&[]),
            Err(PbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let result = SecretPassword::from_bytes(&[0xC3, 0x28]);
        assert!(matches!(result, Err(PbeError::Configuration(_))));
    }

    #[test]
    fn test_normalized_buffer_never_grows() {
        let password = SecretPassword::new("pa\u{0073}\u{0301}ss-\u{00E9}t\u{00E9}").unwrap();
        let normalized = password.normalized();

        assert_eq!(normalized.value.capacity(), password.expose().len() * 3);
        assert!(normalized.expose().len() <= password.expose().len());
    }

    #[test]
    fn test_normalization_composes() {
        // "e" followed by a combining acute accent
        let decomposed = SecretPassword::new("caf\u{0065}\u{0301}").unwrap();
        let composed = SecretPassword::new("caf\u{00E9}").unwrap();

        assert_ne!(decomposed.expose(), composed.expose());
        assert_eq!(decomposed.normalized().expose(), composed.normalized().expose());
    }

    #[test]
    fn test_debug_redacted() {
        let password = SecretPassword::new("hunter2").unwrap();
        let debug = format!("{:?}", password);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("hunter2"));

        let key = DerivedKey::new("PBEWithHmacSHA512AndAES_256", vec![7u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("7, 7"));
    }
}
