//! # pbe-core
//!
//! Password-based encryption engine including:
//! - Binary, text, decimal and integer encryptors over one shared engine
//! - Pluggable salt generators (random, zero, fixed)
//! - A cipher provider seam with a built-in PBKDF2/Argon2id + AES provider
//! - A registry for sharing encryptors by identifier
//! - JSON settings for cipher configuration

pub mod crypto;
pub mod encryptor;
pub mod error;
pub mod registry;
pub mod salt;
pub mod settings;

pub use error::{PbeError, Result};
pub use encryptor::{
    BinaryEncryptor, DecimalEncryptor, Encryptor, IntegerEncryptor, PbeConfig, TextEncryptor,
};
pub use salt::{FixedSalt, SaltGenerator, SecureSalt, ZeroSalt};
pub use crypto::{CipherProvider, PbeCipher, RustCryptoProvider};
pub use registry::{EncryptorRegistry, RegistryKey};
pub use settings::{CipherSettings, SaltSettings, Settings, SettingsManager};

pub use bigdecimal;
pub use num_bigint;
