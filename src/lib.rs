//! VaultKV - Encrypted, Compressed Key-Value Storage
//!
//! VaultKV stores opaque values behind a serialize -> compress -> encrypt
//! pipeline, with interchangeable storage backends (filesystem plus SQLite
//! catalog, or Redis) and access-pattern analytics that turn usage history
//! into heuristic recommendations.

pub mod analyzer;
pub mod codec;
pub mod common;
pub mod config;
pub mod store;

// Re-export common types for convenience
pub use common::{VaultKvError, VaultKvResult};

// Re-export the codec stages for convenience
pub use codec::{
    load_or_generate_salt, CompressionAlgorithm, CompressionCodec, EncryptionCodec, StoredValue,
    SALT_LEN,
};

// Re-export the storage layer for convenience
pub use store::{
    EntryMetadata, FilesystemStore, KeyAccessCount, RedisStore, StorageBackend, StoreStatistics,
    ValuePipeline,
};

// Re-export the analyzer layer for convenience
pub use analyzer::{
    AccessEvent, AnalysisReport, KeyInsights, Operation, PatternAnalyzer, RedisPatternAnalyzer,
    SqlitePatternAnalyzer,
};

// Re-export configuration for convenience
pub use config::{AnalyzerConfig, BackendConfig};
