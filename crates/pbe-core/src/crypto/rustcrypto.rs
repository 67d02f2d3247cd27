//! Built-in cipher provider backed by the RustCrypto crates
//!
//! Every scheme derives key and IV (or nonce) from a single KDF output over
//! password, salt and iteration count, so a fixed salt gives fixed ciphertext.

use std::sync::Arc;

use aes::{Aes128, Aes256};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use super::provider::{CipherError, CipherMode, CipherProvider, PbeCipher, PbeParameters};
use super::{DerivedKey, SecretPassword};

/// Name the built-in provider registers under
pub const PROVIDER_NAME: &str = "RustCrypto";

/// Memory cost for the Argon2id scheme in KiB
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kdf {
    Pbkdf2Sha256,
    Pbkdf2Sha512,
    Argon2id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Aes128Cbc,
    Aes256Cbc,
    Aes256Gcm,
}

/// One named password-based encryption scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbeScheme {
    name: &'static str,
    kdf: Kdf,
    transform: Transform,
}

const SCHEMES: &[PbeScheme] = &[
    PbeScheme {
        name: "PBEWithHmacSHA256AndAES_128",
        kdf: Kdf::Pbkdf2Sha256,
        transform: Transform::Aes128Cbc,
    },
    PbeScheme {
        name: "PBEWithHmacSHA256AndAES_256",
        kdf: Kdf::Pbkdf2Sha256,
        transform: Transform::Aes256Cbc,
    },
    PbeScheme {
        name: "PBEWithHmacSHA512AndAES_256",
        kdf: Kdf::Pbkdf2Sha512,
        transform: Transform::Aes256Cbc,
    },
    PbeScheme {
        name: "PBEWithArgon2idAndAES_256",
        kdf: Kdf::Argon2id,
        transform: Transform::Aes256Cbc,
    },
    PbeScheme {
        name: "PBEWithHmacSHA256AndAES_256_GCM",
        kdf: Kdf::Pbkdf2Sha256,
        transform: Transform::Aes256Gcm,
    },
];

/// Names of all schemes the built-in provider understands
pub fn supported_algorithms() -> impl Iterator<Item = &'static str> {
    SCHEMES.iter().map(|scheme| scheme.name)
}

impl PbeScheme {
    /// Find a scheme by name, ignoring ASCII case
    pub fn lookup(algorithm: &str) -> Option<&'static PbeScheme> {
        SCHEMES
            .iter()
            .find(|scheme| scheme.name.eq_ignore_ascii_case(algorithm))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn key_len(&self) -> usize {
        match self.transform {
            Transform::Aes128Cbc => 16,
            Transform::Aes256Cbc | Transform::Aes256Gcm => 32,
        }
    }

    fn iv_len(&self) -> usize {
        match self.transform {
            Transform::Aes128Cbc | Transform::Aes256Cbc => 16,
            Transform::Aes256Gcm => 12,
        }
    }

    /// Block size of the transform, 0 for the AEAD scheme
    pub fn block_size(&self) -> usize {
        match self.transform {
            Transform::Aes128Cbc | Transform::Aes256Cbc => 16,
            Transform::Aes256Gcm => 0,
        }
    }

    /// Run the KDF and return `key || iv`
    fn derive(
        &self,
        password: &[u8],
        params: &PbeParameters<'_>,
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        if params.iterations == 0 {
            return Err(CipherError::Failed);
        }

        let mut output = Zeroizing::new(vec![0u8; self.key_len() + self.iv_len()]);
        match self.kdf {
            Kdf::Pbkdf2Sha256 => {
                pbkdf2::<Hmac<Sha256>>(password, params.salt, params.iterations, &mut output)
                    .map_err(|_| CipherError::Failed)?
            }
            Kdf::Pbkdf2Sha512 => {
                pbkdf2::<Hmac<Sha512>>(password, params.salt, params.iterations, &mut output)
                    .map_err(|_| CipherError::Failed)?
            }
            Kdf::Argon2id => {
                let argon2_params = Params::new(
                    ARGON2_MEMORY_KIB,
                    params.iterations,
                    1,
                    Some(output.len()),
                )
                .map_err(|_| CipherError::Failed)?;

                Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params)
                    .hash_password_into(password, params.salt, &mut output)
                    .map_err(|_| CipherError::Failed)?
            }
        }

        Ok(output)
    }
}

fn key_size_error(len: usize) -> CipherError {
    CipherError::InvalidKey(format!("illegal key size: {} bytes", len))
}

/// Transform state captured by `init`
struct Pending {
    mode: CipherMode,
    key_iv: Zeroizing<Vec<u8>>,
}

/// Cipher handle for one [`PbeScheme`]
pub struct RustCryptoCipher {
    scheme: PbeScheme,
    pending: Option<Pending>,
}

impl RustCryptoCipher {
    pub fn new(scheme: PbeScheme) -> Self {
        Self {
            scheme,
            pending: None,
        }
    }

    fn transform(&self, pending: &Pending, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let (key, iv) = pending.key_iv.split_at(self.scheme.key_len());

        match (self.scheme.transform, pending.mode) {
            (Transform::Aes128Cbc, CipherMode::Encrypt) => {
                Ok(cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
                    .map_err(|_| key_size_error(key.len()))?
                    .encrypt_padded_vec_mut::<Pkcs7>(input))
            }
            (Transform::Aes128Cbc, CipherMode::Decrypt) => {
                cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
                    .map_err(|_| key_size_error(key.len()))?
                    .decrypt_padded_vec_mut::<Pkcs7>(input)
                    .map_err(|_| CipherError::Failed)
            }
            (Transform::Aes256Cbc, CipherMode::Encrypt) => {
                Ok(cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
                    .map_err(|_| key_size_error(key.len()))?
                    .encrypt_padded_vec_mut::<Pkcs7>(input))
            }
            (Transform::Aes256Cbc, CipherMode::Decrypt) => {
                cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
                    .map_err(|_| key_size_error(key.len()))?
                    .decrypt_padded_vec_mut::<Pkcs7>(input)
                    .map_err(|_| CipherError::Failed)
            }
            (Transform::Aes256Gcm, mode) => {
                let cipher =
                    Aes256Gcm::new_from_slice(key).map_err(|_| key_size_error(key.len()))?;
                let nonce = Nonce::from_slice(iv);
                match mode {
                    CipherMode::Encrypt => cipher.encrypt(nonce, input),
                    CipherMode::Decrypt => cipher.decrypt(nonce, input),
                }
                .map_err(|_| CipherError::Failed)
            }
        }
    }
}

impl PbeCipher for RustCryptoCipher {
    fn block_size(&self) -> usize {
        self.scheme.block_size()
    }

    fn init(
        &mut self,
        mode: CipherMode,
        key: &DerivedKey,
        params: &PbeParameters<'_>,
    ) -> Result<(), CipherError> {
        if !key.algorithm().eq_ignore_ascii_case(self.scheme.name) {
            return Err(CipherError::InvalidKey(format!(
                "key was derived for {}",
                key.algorithm()
            )));
        }
        if key.is_empty() {
            return Err(key_size_error(0));
        }

        let key_iv = self.scheme.derive(key.material(), params)?;
        self.pending = Some(Pending { mode, key_iv });
        Ok(())
    }

    fn do_final(&mut self, input: &[u8]) -> Result<Vec<u8>, CipherError> {
        let pending = self.pending.take().ok_or(CipherError::NotInitialized)?;
        self.transform(&pending, input)
    }
}

/// The default cipher provider
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoProvider;

impl CipherProvider for RustCryptoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn derive_key(
        &self,
        algorithm: &str,
        password: &SecretPassword,
    ) -> Result<DerivedKey, CipherError> {
        let scheme = PbeScheme::lookup(algorithm)
            .ok_or_else(|| CipherError::NoSuchAlgorithm(algorithm.to_string()))?;

        // The key carries the password itself; salt and iterations are mixed
        // in per operation.
        Ok(DerivedKey::new(
            scheme.name,
            password.expose().as_bytes().to_vec(),
        ))
    }

    fn cipher(&self, algorithm: &str) -> Result<Box<dyn PbeCipher>, CipherError> {
        let scheme = PbeScheme::lookup(algorithm)
            .ok_or_else(|| CipherError::NoSuchAlgorithm(algorithm.to_string()))?;
        Ok(Box::new(RustCryptoCipher::new(*scheme)))
    }
}

/// Resolve a provider by name among the built-in providers
pub fn provider_by_name(name: &str) -> Result<Arc<dyn CipherProvider>, CipherError> {
    if name.eq_ignore_ascii_case(PROVIDER_NAME) {
        Ok(Arc::new(RustCryptoProvider))
    } else {
        Err(CipherError::NoSuchProvider(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_for(algorithm: &str, password: &str) -> DerivedKey {
        RustCryptoProvider
            .derive_key(algorithm, &SecretPassword::new(password).unwrap())
            .unwrap()
    }

    fn run(
        cipher: &mut dyn PbeCipher,
        mode: CipherMode,
        key: &DerivedKey,
        salt: &[u8],
        input: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let params = PbeParameters {
            salt,
            iterations: 2,
        };
        cipher.init(mode, key, &params)?;
        cipher.do_final(input)
    }

    #[test]
    fn test_pbkdf2_sha256_known_answer() {
        let scheme = PbeScheme::lookup("PBEWithHmacSHA256AndAES_256").unwrap();
        let params = PbeParameters {
            salt: b"salt",
            iterations: 1,
        };

        let output = scheme.derive(b"password", &params).unwrap();

        assert_eq!(output.len(), 48);
        assert_eq!(
            hex::encode(&output[..32]),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn test_lookup_ignores_case() {
        let scheme = PbeScheme::lookup("pbewithhmacsha512andaes_256").unwrap();
        assert_eq!(scheme.name(), "PBEWithHmacSHA512AndAES_256");
        assert!(PbeScheme::lookup("PBEWithMD5AndDES").is_none());
    }

    #[test]
    fn test_every_scheme_roundtrip() {
        let salt = [9u8; 16];
        let plaintext = b"The quick brown fox jumps over the lazy dog";

        for algorithm in supported_algorithms() {
            let key = key_for(algorithm, "correct horse");
            let mut cipher = RustCryptoProvider.cipher(algorithm).unwrap();

            let encrypted =
                run(cipher.as_mut(), CipherMode::Encrypt, &key, &salt, plaintext).unwrap();
            assert_ne!(encrypted.as_slice(), plaintext.as_slice());

            let decrypted =
                run(cipher.as_mut(), CipherMode::Decrypt, &key, &salt, &encrypted).unwrap();
            assert_eq!(decrypted, plaintext, "scheme {}", algorithm);
        }
    }

    #[test]
    fn test_cbc_output_is_padded_to_block() {
        let key = key_for("PBEWithHmacSHA256AndAES_128", "pw");
        let mut cipher = RustCryptoProvider
            .cipher("PBEWithHmacSHA256AndAES_128")
            .unwrap();

        let empty = run(cipher.as_mut(), CipherMode::Encrypt, &key, &[1u8; 16], b"").unwrap();
        assert_eq!(empty.len(), 16);

        let full = run(cipher.as_mut(), CipherMode::Encrypt, &key, &[1u8; 16], &[0u8; 16]).unwrap();
        assert_eq!(full.len(), 32);
    }

    #[test]
    fn test_do_final_requires_init() {
        let mut cipher = RustCryptoProvider
            .cipher("PBEWithHmacSHA256AndAES_256")
            .unwrap();
        assert!(matches!(
            cipher.do_final(b"data"),
            Err(CipherError::NotInitialized)
        ));

        // init is consumed by one transform
        let key = key_for("PBEWithHmacSHA256AndAES_256", "pw");
        run(cipher.as_mut(), CipherMode::Encrypt, &key, &[0u8; 16], b"data").unwrap();
        assert!(matches!(
            cipher.do_final(b"data"),
            Err(CipherError::NotInitialized)
        ));
    }

    #[test]
    fn test_gcm_wrong_password_fails() {
        let algorithm = "PBEWithHmacSHA256AndAES_256_GCM";
        let mut cipher = RustCryptoProvider.cipher(algorithm).unwrap();
        let salt = [3u8; 8];

        let encrypted = run(
            cipher.as_mut(),
            CipherMode::Encrypt,
            &key_for(algorithm, "right"),
            &salt,
            b"secret",
        )
        .unwrap();
        let result = run(
            cipher.as_mut(),
            CipherMode::Decrypt,
            &key_for(algorithm, "wrong"),
            &salt,
            &encrypted,
        );

        assert!(matches!(result, Err(CipherError::Failed)));
    }

    #[test]
    fn test_key_for_other_algorithm_rejected() {
        let key = key_for("PBEWithHmacSHA256AndAES_128", "pw");
        let mut cipher = RustCryptoProvider
            .cipher("PBEWithHmacSHA512AndAES_256")
            .unwrap();

        let result = run(cipher.as_mut(), CipherMode::Encrypt, &key, &[0u8; 16], b"x");
        assert!(matches!(result, Err(CipherError::InvalidKey(_))));
    }

    #[test]
    fn test_unknown_algorithm_and_provider() {
        assert!(matches!(
            RustCryptoProvider.cipher("PBEWithMD5AndDES"),
            Err(CipherError::NoSuchAlgorithm(_))
        ));
        assert!(provider_by_name("rustcrypto").is_ok());
        assert!(matches!(
            provider_by_name("SunJCE"),
            Err(CipherError::NoSuchProvider(_))
        ));
    }
}
