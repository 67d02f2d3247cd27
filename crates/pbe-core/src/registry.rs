//! Registry for looking up shared encryptors by identifier
//!
//! Encryptors hold live key material and cannot be serialized. Anything that
//! needs to be persisted stores a [`RegistryKey`] instead and resolves it
//! through a registry shared by the process.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::encryptor::TextEncryptor;

/// Stable identifier of a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryKey(u64);

impl RegistryKey {
    /// Hash a name into a key; the same name gives the same key in every process
    pub fn from_name(name: &str) -> Self {
        Self::digest(name.as_bytes())
    }

    pub fn value(self) -> u64 {
        self.0
    }

    fn digest(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash[..8]);
        Self(u64::from_be_bytes(prefix))
    }
}

impl std::fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<&str> for RegistryKey {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl From<&String> for RegistryKey {
    fn from(name: &String) -> Self {
        Self::from_name(name)
    }
}

impl From<String> for RegistryKey {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<u64> for RegistryKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<i64> for RegistryKey {
    fn from(value: i64) -> Self {
        Self(value as u64)
    }
}

impl From<Uuid> for RegistryKey {
    fn from(uuid: Uuid) -> Self {
        Self::digest(uuid.as_bytes())
    }
}

/// Registry of shared encryptors
pub struct EncryptorRegistry<E = TextEncryptor> {
    entries: RwLock<HashMap<RegistryKey, Arc<E>>>,
}

impl<E> EncryptorRegistry<E> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register an encryptor, replacing any previous entry.
    ///
    /// Registering `None` removes the entry. Returns the replaced encryptor.
    pub fn register(
        &self,
        id: impl Into<RegistryKey>,
        encryptor: impl Into<Option<Arc<E>>>,
    ) -> Option<Arc<E>> {
        let key = id.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        match encryptor.into() {
            Some(encryptor) => {
                debug!("Registering encryptor {}", key);
                entries.insert(key, encryptor)
            }
            None => {
                debug!("Clearing encryptor {}", key);
                entries.remove(&key)
            }
        }
    }

    /// Register under a freshly generated identifier
    pub fn register_new(&self, encryptor: Arc<E>) -> RegistryKey {
        let key = RegistryKey::from(Uuid::new_v4());
        self.register(key, encryptor);
        key
    }

    /// Look up an encryptor; unknown identifiers give `None`
    pub fn lookup(&self, id: impl Into<RegistryKey>) -> Option<Arc<E>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&id.into()).cloned()
    }

    /// Remove an entry, returning it
    pub fn unregister(&self, id: impl Into<RegistryKey>) -> Option<Arc<E>> {
        self.register(id, None)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for EncryptorRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EncryptorRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptorRegistry")
            .field("entries", &self.len())
            .finish()
    }
}
