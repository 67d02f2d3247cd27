//! Password-based encryption of raw bytes
//!
//! Ciphertext layout: `[salt (salt_size bytes, only if the generator embeds it)][cipher output]`

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info};

use super::{Encryptor, PbeConfig, DEFAULT_MAX_CIPHERTEXT_LEN};
use crate::crypto::{
    provider_by_name, CipherError, CipherMode, CipherProvider, DerivedKey, PbeCipher,
    PbeParameters, RustCryptoProvider, SecretPassword,
};
use crate::error::{PbeError, Result};
use crate::salt::{SaltGenerator, SecureSalt};

/// Algorithm used when none is configured
pub const DEFAULT_ALGORITHM: &str = "PBEWithHmacSHA512AndAES_256";

/// Key derivation iterations used when none are configured
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Salt size used when none is configured and the cipher is not a block cipher
pub const DEFAULT_SALT_SIZE: usize = 8;

/// Mutable configuration, frozen by initialization
pub(crate) struct CipherConfig {
    pub(crate) algorithm: String,
    pub(crate) provider: Option<Arc<dyn CipherProvider>>,
    pub(crate) provider_name: Option<String>,
    pub(crate) iterations: u32,
    pub(crate) salt_size: usize,
    pub(crate) salt: Option<Arc<dyn SaltGenerator>>,
    pub(crate) password: Option<SecretPassword>,
    pub(crate) max_ciphertext_len: usize,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            algorithm: DEFAULT_ALGORITHM.to_string(),
            provider: None,
            provider_name: None,
            iterations: DEFAULT_ITERATIONS,
            salt_size: DEFAULT_SALT_SIZE,
            salt: None,
            password: None,
            max_ciphertext_len: DEFAULT_MAX_CIPHERTEXT_LEN,
        }
    }
}

/// Everything an initialized encryptor needs per operation
struct Initialized {
    key: DerivedKey,
    salt: Arc<dyn SaltGenerator>,
    salt_size: usize,
    iterations: u32,
    max_ciphertext_len: usize,
    encryptor: Mutex<Box<dyn PbeCipher>>,
    decryptor: Mutex<Box<dyn PbeCipher>>,
}

/// Password-based encryptor for byte sequences.
///
/// Safe to share between threads. Initialization happens once, either
/// explicitly or on the first encrypt/decrypt.
pub struct BinaryEncryptor {
    config: Mutex<CipherConfig>,
    state: OnceLock<Initialized>,
}

/// Poisoning only means another caller panicked mid-operation; every
/// cipher handle is re-initialized before use, so the data stays usable.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map a provider failure to an error that says nothing about its cause
fn opaque(error: CipherError) -> PbeError {
    if error.is_key_size() {
        PbeError::WeakPolicy
    } else {
        PbeError::EncryptionFailure
    }
}

impl BinaryEncryptor {
    /// Create an unconfigured encryptor; a password must be set before use
    pub fn new() -> Self {
        Self {
            config: Mutex::new(CipherConfig::default()),
            state: OnceLock::new(),
        }
    }

    /// Create an encryptor with default settings and the given password
    pub fn with_password(password: &str) -> Result<Self> {
        let encryptor = Self::new();
        encryptor.set_password(password)?;
        Ok(encryptor)
    }

    pub(crate) fn update_config(&self, field: &str, apply: impl FnOnce(&mut CipherConfig)) {
        let mut config = lock(&self.config);
        if self.state.get().is_some() {
            debug!("Ignoring {} change on an initialized encryptor", field);
            return;
        }
        apply(&mut config);
    }

    pub(crate) fn read_config<T>(&self, read: impl FnOnce(&CipherConfig) -> T) -> T {
        read(&lock(&self.config))
    }

    pub(crate) fn store_password(&self, password: SecretPassword) {
        // the previous password, if any, is zeroed when dropped here
        self.update_config("password", move |config| config.password = Some(password));
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state.get().is_some()
    }

    pub(crate) fn initialize_engine(&self) -> Result<()> {
        if self.state.get().is_some() {
            return Ok(());
        }

        let mut config = lock(&self.config);

        // another caller may have finished while we waited for the lock
        if self.state.get().is_some() {
            return Ok(());
        }

        let password = config
            .password
            .as_ref()
            .ok_or_else(|| PbeError::config("password has not been set"))?
            .normalized();

        if config.iterations == 0 {
            return Err(PbeError::config("iteration count must be at least 1"));
        }

        let provider = match (&config.provider, &config.provider_name) {
            (Some(provider), _) => provider.clone(),
            (None, Some(name)) => provider_by_name(name).map_err(opaque)?,
            (None, None) => Arc::new(RustCryptoProvider) as Arc<dyn CipherProvider>,
        };

        let encryptor = provider.cipher(&config.algorithm).map_err(opaque)?;
        let decryptor = provider.cipher(&config.algorithm).map_err(opaque)?;

        // block ciphers use one block of salt
        let block_size = encryptor.block_size();
        let salt_size = if block_size > 0 {
            block_size
        } else {
            config.salt_size
        };
        if salt_size == 0 {
            return Err(PbeError::config("salt size must be at least 1"));
        }

        let key = provider
            .derive_key(&config.algorithm, &password)
            .map_err(opaque)?;

        // the raw password is no longer needed
        drop(password);
        config.password = None;

        config.salt_size = salt_size;
        let salt = config
            .salt
            .get_or_insert_with(|| Arc::new(SecureSalt) as Arc<dyn SaltGenerator>)
            .clone();

        info!(
            "Initialized encryptor: algorithm={} provider={} iterations={} salt_size={} embedded_salt={}",
            config.algorithm,
            provider.name(),
            config.iterations,
            salt_size,
            salt.embeds_plaintext()
        );

        let initialized = Initialized {
            key,
            salt,
            salt_size,
            iterations: config.iterations,
            max_ciphertext_len: config.max_ciphertext_len,
            encryptor: Mutex::new(encryptor),
            decryptor: Mutex::new(decryptor),
        };

        // cannot already be set: every writer holds the config lock
        let _ = self.state.set(initialized);
        Ok(())
    }

    /// Ciphertext length bound in effect, initializing first if needed
    pub(crate) fn frozen_max_ciphertext_len(&self) -> Result<usize> {
        Ok(self.ready()?.max_ciphertext_len)
    }

    /// Initialized state, initializing first if needed
    fn ready(&self) -> Result<&Initialized> {
        if let Some(state) = self.state.get() {
            return Ok(state);
        }
        self.initialize_engine()?;
        self.state.get().ok_or(PbeError::EncryptionFailure)
    }

    fn transform(
        handle: &Mutex<Box<dyn PbeCipher>>,
        mode: CipherMode,
        key: &DerivedKey,
        params: &PbeParameters<'_>,
        input: &[u8],
    ) -> Result<Vec<u8>> {
        let mut cipher = lock(handle);
        cipher.init(mode, key, params).map_err(opaque)?;
        cipher.do_final(input).map_err(opaque)
    }
}

impl Default for BinaryEncryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BinaryEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryEncryptor")
            .field("algorithm", &self.algorithm())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl PbeConfig for BinaryEncryptor {
    fn engine(&self) -> &BinaryEncryptor {
        self
    }
}

impl Encryptor for BinaryEncryptor {
    type Input = [u8];
    type Output = Vec<u8>;

    fn encrypt(&self, message: &[u8]) -> Result<Vec<u8>> {
        let state = self.ready()?;

        let salt = state.salt.generate(state.salt_size)?;
        let params = PbeParameters {
            salt: &salt,
            iterations: state.iterations,
        };

        let encrypted = Self::transform(
            &state.encryptor,
            CipherMode::Encrypt,
            &state.key,
            &params,
            message,
        )?;

        if state.salt.embeds_plaintext() {
            let mut output = Vec::with_capacity(salt.len() + encrypted.len());
            output.extend_from_slice(&salt);
            output.extend_from_slice(&encrypted);
            Ok(output)
        } else {
            Ok(encrypted)
        }
    }

    fn decrypt(&self, message: &[u8]) -> Result<Vec<u8>> {
        let state = self.ready()?;

        let generated;
        let (salt, payload) = if state.salt.embeds_plaintext() {
            if message.len() <= state.salt_size {
                return Err(PbeError::MalformedCiphertext);
            }
            message.split_at(state.salt_size)
        } else {
            // the generator is expected to reproduce the salt used on encryption
            generated = state.salt.generate(state.salt_size)?;
            (generated.as_slice(), message)
        };

        let params = PbeParameters {
            salt,
            iterations: state.iterations,
        };

        Self::transform(
            &state.decryptor,
            CipherMode::Decrypt,
            &state.key,
            &params,
            payload,
        )
    }
}
