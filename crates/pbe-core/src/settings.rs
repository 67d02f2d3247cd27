//! Encryptor settings management
//!
//! Stores cipher configuration in a plain JSON file. Passwords are never
//! part of the settings; they are supplied separately when building an
//! encryptor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::encryptor::{
    BinaryEncryptor, DecimalEncryptor, IntegerEncryptor, PbeConfig, TextEncryptor,
    DEFAULT_ALGORITHM, DEFAULT_ITERATIONS, DEFAULT_MAX_CIPHERTEXT_LEN, DEFAULT_SALT_SIZE,
};
use crate::error::Result;
use crate::salt::{FixedSalt, SaltGenerator, SecureSalt, ZeroSalt};

/// Current settings file version
const SETTINGS_VERSION: u32 = 1;

/// Salt generator selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SaltSettings {
    /// Random salt, embedded in every ciphertext
    #[default]
    Secure,
    /// All-zero salt
    Zero,
    /// Fixed salt given as hex
    Fixed { hex: String },
    /// Fixed salt given as UTF-8 text
    FixedText { value: String },
}

impl SaltSettings {
    /// Build the configured generator
    pub fn generator(&self) -> Result<Arc<dyn SaltGenerator>> {
        Ok(match self {
            SaltSettings::Secure => Arc::new(SecureSalt),
            SaltSettings::Zero => Arc::new(ZeroSalt),
            SaltSettings::Fixed { hex } => Arc::new(FixedSalt::from_hex(hex)?),
            SaltSettings::FixedText { value } => Arc::new(FixedSalt::from_text(value)),
        })
    }
}

/// Cipher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CipherSettings {
    /// Algorithm name, matched case-insensitively by the provider
    pub algorithm: String,
    /// Provider name (None = built-in provider)
    pub provider_name: Option<String>,
    /// Key derivation iterations
    pub iterations: u32,
    /// Salt size; block ciphers override it with their block size
    pub salt_size: usize,
    /// Salt generator
    pub salt: SaltSettings,
    /// Largest ciphertext the numeric encryptors accept
    pub max_ciphertext_bytes: usize,
}

impl Default for CipherSettings {
    fn default() -> Self {
        Self {
            algorithm: DEFAULT_ALGORITHM.to_string(),
            provider_name: None,
            iterations: DEFAULT_ITERATIONS,
            salt_size: DEFAULT_SALT_SIZE,
            salt: SaltSettings::default(),
            max_ciphertext_bytes: DEFAULT_MAX_CIPHERTEXT_LEN,
        }
    }
}

impl CipherSettings {
    /// Push these settings into an encryptor.
    ///
    /// Has no effect on an encryptor that is already initialized.
    pub fn apply(&self, encryptor: &impl PbeConfig) -> Result<()> {
        let salt = self.salt.generator()?;

        encryptor.set_algorithm(&self.algorithm);
        if let Some(name) = &self.provider_name {
            encryptor.set_provider_name(name);
        }
        encryptor.set_iterations(self.iterations);
        encryptor.set_salt_size(self.salt_size);
        encryptor.set_salt_generator(salt);
        Ok(())
    }

    fn configure<E: PbeConfig>(&self, encryptor: E, password: &str) -> Result<E> {
        self.apply(&encryptor)?;
        encryptor.set_password(password)?;
        Ok(encryptor)
    }

    pub fn binary(&self, password: &str) -> Result<BinaryEncryptor> {
        self.configure(BinaryEncryptor::new(), password)
    }

    pub fn text(&self, password: &str) -> Result<TextEncryptor> {
        self.configure(TextEncryptor::new(), password)
    }

    pub fn decimal(&self, password: &str) -> Result<DecimalEncryptor> {
        let encryptor = self.configure(DecimalEncryptor::new(), password)?;
        encryptor.set_max_ciphertext_len(self.max_ciphertext_bytes);
        Ok(encryptor)
    }

    pub fn integer(&self, password: &str) -> Result<IntegerEncryptor> {
        let encryptor = self.configure(IntegerEncryptor::new(), password)?;
        encryptor.set_max_ciphertext_len(self.max_ciphertext_bytes);
        Ok(encryptor)
    }
}

/// Settings file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Cipher configuration
    #[serde(default)]
    pub cipher: CipherSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            cipher: CipherSettings::default(),
        }
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Default settings for `path`, ignoring whatever the file holds
    pub fn new(path: &Path) -> Self {
        Self {
            settings_file: path.to_path_buf(),
            settings: Settings::default(),
        }
    }

    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Self::load_from_file(path)?;

        Ok(Self {
            settings_file: path.to_path_buf(),
            settings,
        })
    }

    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found at {:?}, using defaults", path);
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        if let Some(parent) = self.settings_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, &self.settings_file)?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Get mutable settings
    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Replace the cipher settings and save
    pub fn update_cipher(&mut self, cipher: CipherSettings) -> Result<()> {
        self.settings.cipher = cipher;
        self.save()
    }

    pub fn cipher(&self) -> &CipherSettings {
        &self.settings.cipher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryptor::Encryptor;
    use crate::error::PbeError;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn fast_settings() -> CipherSettings {
        CipherSettings {
            iterations: 10,
            ..CipherSettings::default()
        }
    }

    #[test]
    fn test_settings_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::load(&temp_dir.path().join("settings.json")).unwrap();

        let settings = manager.get();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.cipher.algorithm, DEFAULT_ALGORITHM);
        assert_eq!(settings.cipher.iterations, 1000);
        assert_eq!(settings.cipher.salt_size, 8);
        assert_eq!(settings.cipher.salt, SaltSettings::Secure);
        assert_eq!(settings.cipher.max_ciphertext_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");

        {
            let mut manager = SettingsManager::load(&path).unwrap();
            manager.get_mut().cipher.iterations = 5000;
            manager.get_mut().cipher.algorithm = "PBEWithArgon2idAndAES_256".to_string();
            manager.get_mut().cipher.salt = SaltSettings::Fixed {
                hex: "00112233".to_string(),
            };
            manager.save().unwrap();
        }

        {
            let manager = SettingsManager::load(&path).unwrap();
            assert_eq!(manager.cipher().iterations, 5000);
            assert_eq!(manager.cipher().algorithm, "PBEWithArgon2idAndAES_256");
            assert_eq!(
                manager.cipher().salt,
                SaltSettings::Fixed {
                    hex: "00112233".to_string()
                }
            );
        }

        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_update_cipher_saves() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let mut manager = SettingsManager::load(&path).unwrap();

        manager
            .update_cipher(CipherSettings {
                provider_name: Some("RustCrypto".to_string()),
                ..fast_settings()
            })
            .unwrap();

        let reloaded = SettingsManager::load(&path).unwrap();
        assert_eq!(reloaded.cipher().provider_name.as_deref(), Some("RustCrypto"));
        assert_eq!(reloaded.cipher().iterations, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "version": 1, "cipher": { "iterations": 42, "salt": { "type": "zero" } } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.cipher.iterations, 42);
        assert_eq!(settings.cipher.salt, SaltSettings::Zero);
        assert_eq!(settings.cipher.algorithm, DEFAULT_ALGORITHM);
        assert!(settings.cipher.provider_name.is_none());
    }

    #[test]
    fn test_salt_settings_json() {
        let salt = SaltSettings::FixedText {
            value: "pepper".to_string(),
        };
        let json = serde_json::to_string(&salt).unwrap();
        assert_eq!(json, r#"{"type":"fixedText","value":"pepper"}"#);
    }

    #[test]
    fn test_invalid_json_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            SettingsManager::load(&path),
            Err(PbeError::SerializationError(_))
        ));
    }

    #[test]
    fn test_apply_configures_engine() {
        let settings = CipherSettings {
            algorithm: "PBEWithHmacSHA256AndAES_128".to_string(),
            salt: SaltSettings::Zero,
            ..fast_settings()
        };
        let encryptor = settings.text("password").unwrap();

        assert_eq!(encryptor.algorithm(), "PBEWithHmacSHA256AndAES_128");
        assert_eq!(encryptor.iterations(), 10);

        // zero salt is not embedded, so output is deterministic
        let first = encryptor.encrypt("value").unwrap();
        assert_eq!(first, encryptor.encrypt("value").unwrap());
        assert_eq!(encryptor.decrypt(&first).unwrap(), "value");
    }

    #[test]
    fn test_fixed_salt_interoperates() {
        let settings = CipherSettings {
            salt: SaltSettings::FixedText {
                value: "0123456789abcdef".to_string(),
            },
            ..fast_settings()
        };

        let encrypted = settings.binary("password").unwrap().encrypt(b"bytes").unwrap();
        let decrypted = settings.binary("password").unwrap().decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, b"bytes");
    }

    #[test]
    fn test_invalid_salt_hex_rejected() {
        let settings = CipherSettings {
            salt: SaltSettings::Fixed {
                hex: "zz".to_string(),
            },
            ..fast_settings()
        };

        assert!(matches!(
            settings.binary("password"),
            Err(PbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_numeric_builders_carry_limit() {
        let settings = CipherSettings {
            max_ciphertext_bytes: 1024,
            ..fast_settings()
        };

        let decimal = settings.decimal("password").unwrap();
        assert_eq!(decimal.max_ciphertext_len(), 1024);
        let value = BigDecimal::from_str("19.99").unwrap();
        let encrypted = decimal.encrypt(&value).unwrap();
        assert_eq!(
            decimal.decrypt(&encrypted).unwrap().as_bigint_and_exponent(),
            value.as_bigint_and_exponent()
        );

        let integer = settings.integer("password").unwrap();
        assert_eq!(integer.max_ciphertext_len(), 1024);
    }

    #[test]
    fn test_apply_after_initialize_is_ignored() {
        let encryptor = fast_settings().text("password").unwrap();
        encryptor.initialize().unwrap();

        let other = CipherSettings {
            algorithm: "PBEWithHmacSHA256AndAES_128".to_string(),
            ..fast_settings()
        };
        other.apply(&encryptor).unwrap();

        assert_eq!(encryptor.algorithm(), DEFAULT_ALGORITHM);
    }
}
