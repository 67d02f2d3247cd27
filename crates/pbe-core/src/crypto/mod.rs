//! Cryptographic primitives behind the encryptors
//!
//! This module provides:
//! - The cipher provider seam (`CipherProvider`, `PbeCipher`)
//! - A built-in provider over PBKDF2/Argon2id and AES-CBC/AES-GCM
//! - Secure memory handling with zeroize

mod provider;
mod rustcrypto;
mod secure_memory;

pub use provider::{CipherError, CipherMode, CipherProvider, PbeCipher, PbeParameters};
pub use rustcrypto::{
    provider_by_name, supported_algorithms, PbeScheme, RustCryptoCipher, RustCryptoProvider,
    PROVIDER_NAME,
};
pub use secure_memory::{DerivedKey, SecretPassword};
