//! Error handling for VaultKV

use thiserror::Error;

/// Main error type for VaultKV operations.
///
/// Absent keys are deliberately not represented here: `retrieve` reports them
/// as `Ok(None)` and `delete` as `Ok(false)`.
#[derive(Error, Debug)]
pub enum VaultKvError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for VaultKvError {
    fn from(e: rusqlite::Error) -> Self {
        VaultKvError::Catalog(e.to_string())
    }
}

impl From<redis::RedisError> for VaultKvError {
    fn from(e: redis::RedisError) -> Self {
        VaultKvError::BackendUnavailable(e.to_string())
    }
}

/// Result type alias for VaultKV operations
pub type VaultKvResult<T> = std::result::Result<T, VaultKvError>;
