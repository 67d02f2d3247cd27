//! Password-based encryption of arbitrary-precision numbers
//!
//! Only the unscaled integer is encrypted; a decimal's scale stays in the
//! clear. Converting the ciphertext into an integer loses leading `0x00`
//! (non-negative) or `0xFF` (negative) bytes, so the ciphertext length is
//! appended as a 4-byte big-endian field:
//!
//! `[ciphertext][len(ciphertext) as i32 BE]`
//!
//! On decryption any stripped bytes are restored from the sign of the
//! encrypted value before the ciphertext is handed to the binary encryptor.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

use super::{BinaryEncryptor, Encryptor, PbeConfig};
use crate::error::{PbeError, Result};

/// Largest recorded ciphertext length accepted when decrypting
pub const DEFAULT_MAX_CIPHERTEXT_LEN: usize = 16 * 1024 * 1024;

const LENGTH_FIELD_LEN: usize = 4;

/// Append the length trailer to freshly produced ciphertext
fn append_length(mut encrypted: Vec<u8>, limit: usize) -> Result<Vec<u8>> {
    let len = encrypted.len();
    if len > limit || len > i32::MAX as usize {
        return Err(PbeError::UnsafeSize {
            recorded: len as i64,
            limit,
        });
    }

    encrypted.extend_from_slice(&(len as i32).to_be_bytes());
    Ok(encrypted)
}

/// Rebuild the exact ciphertext from the minimal two's-complement bytes of
/// an encrypted value
fn restore_ciphertext(magnitude: Vec<u8>, sign: Sign, limit: usize) -> Result<Vec<u8>> {
    if magnitude.len() <= LENGTH_FIELD_LEN {
        return Ok(magnitude);
    }

    let (candidate, trailer) = magnitude.split_at(magnitude.len() - LENGTH_FIELD_LEN);
    let mut field = [0u8; LENGTH_FIELD_LEN];
    field.copy_from_slice(trailer);
    let recorded = i32::from_be_bytes(field);

    if recorded < 0 || recorded as usize > limit {
        return Err(PbeError::UnsafeSize {
            recorded: i64::from(recorded),
            limit,
        });
    }
    let recorded = recorded as usize;

    match candidate.len().cmp(&recorded) {
        Ordering::Equal => Ok(candidate.to_vec()),
        Ordering::Less => {
            let fill = if sign == Sign::Minus { 0xFF } else { 0x00 };
            let mut restored = vec![fill; recorded - candidate.len()];
            restored.extend_from_slice(candidate);
            Ok(restored)
        }
        Ordering::Greater => Err(PbeError::MalformedCiphertext),
    }
}

/// Shared integer codec behind both numeric encryptors
#[derive(Debug)]
struct IntegerCodec {
    engine: BinaryEncryptor,
}

impl IntegerCodec {
    fn new(engine: BinaryEncryptor) -> Self {
        Self { engine }
    }

    /// Frozen with the rest of the configuration on initialization
    fn set_max_ciphertext_len(&self, limit: usize) {
        self.engine
            .update_config("maxCiphertextLen", move |config| {
                config.max_ciphertext_len = limit
            });
    }

    fn max_ciphertext_len(&self) -> usize {
        self.engine.read_config(|config| config.max_ciphertext_len)
    }

    fn encrypt(&self, value: &BigInt) -> Result<BigInt> {
        let limit = self.engine.frozen_max_ciphertext_len()?;
        let encrypted = self.engine.encrypt(&value.to_signed_bytes_be())?;
        let framed = append_length(encrypted, limit)?;
        Ok(BigInt::from_signed_bytes_be(&framed))
    }

    fn decrypt(&self, value: &BigInt) -> Result<BigInt> {
        let limit = self.engine.frozen_max_ciphertext_len()?;
        let encrypted = restore_ciphertext(value.to_signed_bytes_be(), value.sign(), limit)?;
        let decrypted = self.engine.decrypt(&encrypted)?;
        Ok(BigInt::from_signed_bytes_be(&decrypted))
    }
}

/// Encryptor for arbitrary-precision integers
#[derive(Debug)]
pub struct IntegerEncryptor {
    codec: IntegerCodec,
}

impl IntegerEncryptor {
    pub fn new() -> Self {
        Self::from(BinaryEncryptor::new())
    }

    /// Create an encryptor with default settings and the given password
    pub fn with_password(password: &str) -> Result<Self> {
        Ok(Self::from(BinaryEncryptor::with_password(password)?))
    }

    /// Bound on the ciphertext length recorded in an encrypted value.
    ///
    /// Ignored once the encryptor is initialized.
    pub fn set_max_ciphertext_len(&self, limit: usize) {
        self.codec.set_max_ciphertext_len(limit);
    }

    pub fn max_ciphertext_len(&self) -> usize {
        self.codec.max_ciphertext_len()
    }
}

impl Default for IntegerEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryEncryptor> for IntegerEncryptor {
    fn from(engine: BinaryEncryptor) -> Self {
        Self {
            codec: IntegerCodec::new(engine),
        }
    }
}

impl PbeConfig for IntegerEncryptor {
    fn engine(&self) -> &BinaryEncryptor {
        &self.codec.engine
    }
}

impl Encryptor for IntegerEncryptor {
    type Input = BigInt;
    type Output = BigInt;

    fn encrypt(&self, message: &BigInt) -> Result<BigInt> {
        self.codec.encrypt(message)
    }

    fn decrypt(&self, message: &BigInt) -> Result<BigInt> {
        self.codec.decrypt(message)
    }
}

/// Encryptor for arbitrary-precision decimals; the scale is not encrypted
#[derive(Debug)]
pub struct DecimalEncryptor {
    codec: IntegerCodec,
}

impl DecimalEncryptor {
    pub fn new() -> Self {
        Self::from(BinaryEncryptor::new())
    }

    /// Create an encryptor with default settings and the given password
    pub fn with_password(password: &str) -> Result<Self> {
        Ok(Self::from(BinaryEncryptor::with_password(password)?))
    }

    /// Bound on the ciphertext length recorded in an encrypted value.
    ///
    /// Ignored once the encryptor is initialized.
    pub fn set_max_ciphertext_len(&self, limit: usize) {
        self.codec.set_max_ciphertext_len(limit);
    }

    pub fn max_ciphertext_len(&self) -> usize {
        self.codec.max_ciphertext_len()
    }
}

impl Default for DecimalEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryEncryptor> for DecimalEncryptor {
    fn from(engine: BinaryEncryptor) -> Self {
        Self {
            codec: IntegerCodec::new(engine),
        }
    }
}

impl PbeConfig for DecimalEncryptor {
    fn engine(&self) -> &BinaryEncryptor {
        &self.codec.engine
    }
}

impl Encryptor for DecimalEncryptor {
    type Input = BigDecimal;
    type Output = BigDecimal;

    fn encrypt(&self, message: &BigDecimal) -> Result<BigDecimal> {
        let (unscaled, scale) = message.as_bigint_and_exponent();
        Ok(BigDecimal::new(self.codec.encrypt(&unscaled)?, scale))
    }

    fn decrypt(&self, message: &BigDecimal) -> Result<BigDecimal> {
        let (unscaled, scale) = message.as_bigint_and_exponent();
        Ok(BigDecimal::new(self.codec.decrypt(&unscaled)?, scale))
    }
}
