//! Authenticated encryption codec
//!
//! AES-256-GCM keyed by PBKDF2-HMAC-SHA256 over a passphrase. The salt is
//! per store: generated randomly on first use and persisted next to the store
//! (see [`load_or_generate_salt`]) rather than hard-coded, so two stores with
//! the same passphrase still derive distinct keys.
//!
//! Tokens are self-describing: `[version(1)][nonce(12)][ciphertext + GCM tag]`.
//! Decryption fails closed on tampering, truncation, or a wrong key; partial
//! plaintext is never returned.

use crate::common::{VaultKvError, VaultKvResult};
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::path::Path;
use zeroize::Zeroize;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

const PBKDF2_ITERATIONS: u32 = 100_000;
const TOKEN_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encryption codec holding a key derived once at construction.
///
/// Immutable after construction and safe to share across threads.
#[derive(Clone)]
pub struct EncryptionCodec {
    cipher: Aes256Gcm,
}

impl EncryptionCodec {
    /// Derives a 256-bit key from `passphrase` and `salt` and builds the codec.
    ///
    /// Key derivation is PBKDF2-HMAC-SHA256 with 100,000 iterations, so
    /// construction is deliberately slow; build the codec once and share it.
    pub fn new(passphrase: &str, salt: &[u8]) -> VaultKvResult<Self> {
        if salt.is_empty() {
            return Err(VaultKvError::Encryption(
                "salt must not be empty".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        key.zeroize();
        Ok(Self { cipher })
    }

    /// Generates a fresh random salt
    pub fn generate_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        salt
    }

    /// Encrypts `plaintext` into a self-describing token with a random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> VaultKvResult<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultKvError::Encryption("AES-GCM encryption failed".to_string()))?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(nonce.as_slice());
        token.extend_from_slice(&ciphertext);
        Ok(token)
    }

    /// Decrypts a token, verifying the authentication tag.
    ///
    /// Fails closed: any authentication failure, unknown version, or truncated
    /// token is a `Decryption` error and no plaintext bytes are returned.
    pub fn decrypt(&self, token: &[u8]) -> VaultKvResult<Vec<u8>> {
        if token.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(VaultKvError::Decryption("token too short".to_string()));
        }
        if token[0] != TOKEN_VERSION {
            return Err(VaultKvError::Decryption(format!(
                "unsupported token version: {}",
                token[0]
            )));
        }
        let nonce = Nonce::from_slice(&token[1..1 + NONCE_LEN]);
        self.cipher
            .decrypt(nonce, &token[1 + NONCE_LEN..])
            .map_err(|_| VaultKvError::Decryption("authentication failed".to_string()))
    }
}

/// Loads the store's salt from `path`, generating and persisting a fresh one
/// if the file does not exist yet.
pub fn load_or_generate_salt(path: &Path) -> VaultKvResult<Vec<u8>> {
    if path.exists() {
        let salt = std::fs::read(path)?;
        if salt.len() != SALT_LEN {
            return Err(VaultKvError::Encryption(format!(
                "salt file {} has unexpected length {}",
                path.display(),
                salt.len()
            )));
        }
        Ok(salt)
    } else {
        let salt = EncryptionCodec::generate_salt();
        std::fs::write(path, salt)?;
        Ok(salt.to_vec())
    }
}
