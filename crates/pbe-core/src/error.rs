//! Error types for pbe-core

use thiserror::Error;

/// Result type alias for encryptor operations
pub type Result<T> = std::result::Result<T, PbeError>;

/// Encryptor error types
///
/// Cipher failures are deliberately collapsed into [`PbeError::EncryptionFailure`]:
/// a caller cannot tell a wrong password from corrupted ciphertext or an
/// unsupported algorithm. The only cause that is surfaced is a rejected key size.
#[derive(Error, Debug)]
pub enum PbeError {
    #[error("Invalid encryptor configuration: {0}")]
    Configuration(String),

    #[error("Malformed ciphertext")]
    MalformedCiphertext,

    #[error("Encryption operation failed")]
    EncryptionFailure,

    #[error(
        "Encryption raised an exception. A possible cause is that the requested key size \
         is not permitted by the active cryptographic policy; an unrestricted-strength \
         policy may be required"
    )]
    WeakPolicy,

    #[error("Recorded ciphertext length {recorded} exceeds the safe limit of {limit} bytes")]
    UnsafeSize { recorded: i64, limit: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PbeError {
    /// Shorthand for a configuration error
    pub(crate) fn config(message: impl Into<String>) -> Self {
        PbeError::Configuration(message.into())
    }
}
