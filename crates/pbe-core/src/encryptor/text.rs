//! Password-based encryption of text
//!
//! Plaintext is always UTF-8; ciphertext is standard Base64 of the binary
//! ciphertext, so it is plain ASCII.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{BinaryEncryptor, Encryptor, PbeConfig};
use crate::error::{PbeError, Result};

/// Encryptor for strings
#[derive(Debug, Default)]
pub struct TextEncryptor {
    engine: BinaryEncryptor,
}

impl TextEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encryptor with default settings and the given password
    pub fn with_password(password: &str) -> Result<Self> {
        Ok(Self {
            engine: BinaryEncryptor::with_password(password)?,
        })
    }
}

impl From<BinaryEncryptor> for TextEncryptor {
    fn from(engine: BinaryEncryptor) -> Self {
        Self { engine }
    }
}

impl PbeConfig for TextEncryptor {
    fn engine(&self) -> &BinaryEncryptor {
        &self.engine
    }
}

impl Encryptor for TextEncryptor {
    type Input = str;
    type Output = String;

    fn encrypt(&self, message: &str) -> Result<String> {
        let encrypted = self.engine.encrypt(message.as_bytes())?;
        Ok(STANDARD.encode(encrypted))
    }

    fn decrypt(&self, message: &str) -> Result<String> {
        // malformed Base64 is reported like any other bad ciphertext
        let encrypted = STANDARD
            .decode(message.as_bytes())
            .map_err(|_| PbeError::EncryptionFailure)?;
        let decrypted = self.engine.decrypt(&encrypted)?;
        String::from_utf8(decrypted).map_err(|_| PbeError::EncryptionFailure)
    }
}
