//! Password-based encryptors
//!
//! [`BinaryEncryptor`] owns configuration, key material and cipher handles.
//! The text and numeric encryptors wrap one by composition and get their
//! configuration surface from [`PbeConfig`].

mod binary;
mod numeric;
mod text;

use std::sync::Arc;

pub use binary::{BinaryEncryptor, DEFAULT_ALGORITHM, DEFAULT_ITERATIONS, DEFAULT_SALT_SIZE};
pub use numeric::{DecimalEncryptor, IntegerEncryptor, DEFAULT_MAX_CIPHERTEXT_LEN};
pub use text::TextEncryptor;

use crate::crypto::{CipherProvider, SecretPassword};
use crate::error::Result;
use crate::salt::SaltGenerator;

/// Encrypt and decrypt one payload shape
pub trait Encryptor {
    type Input: ?Sized;
    type Output;

    fn encrypt(&self, message: &Self::Input) -> Result<Self::Output>;

    fn decrypt(&self, message: &Self::Input) -> Result<Self::Output>;

    /// Absent input passes through as absent output
    fn encrypt_opt(&self, message: Option<&Self::Input>) -> Result<Option<Self::Output>> {
        message.map(|m| self.encrypt(m)).transpose()
    }

    /// Absent input passes through as absent output
    fn decrypt_opt(&self, message: Option<&Self::Input>) -> Result<Option<Self::Output>> {
        message.map(|m| self.decrypt(m)).transpose()
    }
}

/// Configuration surface shared by every encryptor.
///
/// Setters are silently ignored once the underlying engine is initialized.
pub trait PbeConfig {
    /// The engine all configuration is forwarded to
    fn engine(&self) -> &BinaryEncryptor;

    fn set_algorithm(&self, algorithm: &str) {
        let algorithm = algorithm.to_string();
        self.engine()
            .update_config("algorithm", move |config| config.algorithm = algorithm);
    }

    fn algorithm(&self) -> String {
        self.engine().read_config(|config| config.algorithm.clone())
    }

    /// Use this provider instance; takes precedence over a provider name
    fn set_provider(&self, provider: Arc<dyn CipherProvider>) {
        self.engine()
            .update_config("provider", move |config| config.provider = Some(provider));
    }

    fn set_provider_name(&self, name: &str) {
        let name = name.to_string();
        self.engine()
            .update_config("providerName", move |config| config.provider_name = Some(name));
    }

    /// Name of the configured provider, if any was chosen explicitly
    fn provider_name(&self) -> Option<String> {
        self.engine().read_config(|config| {
            config
                .provider
                .as_ref()
                .map(|provider| provider.name().to_string())
                .or_else(|| config.provider_name.clone())
        })
    }

    fn set_iterations(&self, iterations: u32) {
        self.engine()
            .update_config("iterations", move |config| config.iterations = iterations);
    }

    fn iterations(&self) -> u32 {
        self.engine().read_config(|config| config.iterations)
    }

    /// Requested salt size; block ciphers override it with their block size
    fn set_salt_size(&self, salt_size: usize) {
        self.engine()
            .update_config("saltSize", move |config| config.salt_size = salt_size);
    }

    fn salt_size(&self) -> usize {
        self.engine().read_config(|config| config.salt_size)
    }

    fn set_salt_generator(&self, generator: Arc<dyn SaltGenerator>) {
        self.engine()
            .update_config("saltGenerator", move |config| config.salt = Some(generator));
    }

    fn set_password(&self, password: &str) -> Result<()> {
        let password = SecretPassword::new(password)?;
        self.engine().store_password(password);
        Ok(())
    }

    /// Copy the password out of a caller-owned buffer
    fn set_password_bytes(&self, password: &[u8]) -> Result<()> {
        let password = SecretPassword::from_bytes(password)?;
        self.engine().store_password(password);
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        self.engine().initialize_engine()
    }

    fn is_initialized(&self) -> bool {
        self.engine().is_ready()
    }
}
