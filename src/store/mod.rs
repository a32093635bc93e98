//! Storage backends for VaultKV
//!
//! This module provides the storage functionality including:
//! - The `StorageBackend` trait both backends implement
//! - The value transform pipeline (serialize → compress → encrypt)
//! - Filesystem backend (one payload file per key + SQLite catalog)
//! - Redis backend (two namespaced entries per key)
//!
//! Both backends expose identical `EntryMetadata` and `StoreStatistics`
//! shapes; callers can swap one for the other behind `&dyn StorageBackend`
//! with no behavioral difference beyond latency and durability.

pub mod filesystem;
pub mod pipeline;
pub mod redis;

pub use crate::codec::serialize::StoredValue;
pub use filesystem::FilesystemStore;
pub use pipeline::ValuePipeline;
pub use redis::RedisStore;

use crate::common::VaultKvResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of keys reported in `StoreStatistics::top_accessed_keys`
pub const TOP_ACCESSED_LIMIT: usize = 5;

/// Per-key metadata as persisted by a backend.
///
/// `size_bytes` always reflects the stored (post-pipeline) payload, never the
/// original value size. `access_count` is incremented only by `retrieve`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryMetadata {
    pub key: String,
    pub encrypted: bool,
    pub compressed: bool,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub access_count: u64,
}

/// A key together with its retrieve count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyAccessCount {
    pub key: String,
    pub access_count: u64,
}

/// Global aggregate over all current entries (deleted keys excluded)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_keys: u64,
    pub total_size_bytes: u64,
    pub encrypted_keys: u64,
    pub compressed_keys: u64,
    pub top_accessed_keys: Vec<KeyAccessCount>,
}

/// Common contract implemented by both storage backends.
///
/// All calls are synchronous and self-contained: each operation opens
/// whatever connection it needs, completes, and releases it. There are no
/// multi-operation transactions and no cross-key atomicity guarantees.
pub trait StorageBackend: Send + Sync {
    /// Runs the value pipeline and persists payload + metadata, upserting any
    /// existing entry. Returns the metadata actually written.
    fn store(
        &self,
        key: &str,
        value: &StoredValue,
        encrypt: bool,
        compress: bool,
    ) -> VaultKvResult<EntryMetadata>;

    /// Loads and reverses the pipeline for `key`, guided by the persisted
    /// flags. Increments `access_count` as an observable side effect.
    /// Returns `Ok(None)` when the key is absent, not an error.
    fn retrieve(&self, key: &str) -> VaultKvResult<Option<(StoredValue, EntryMetadata)>>;

    /// Removes the entry, returning whether it existed
    fn delete(&self, key: &str) -> VaultKvResult<bool>;

    /// All current keys, lexicographically sorted
    fn list_keys(&self) -> VaultKvResult<Vec<String>>;

    /// Aggregate statistics over the current entries
    fn get_stats(&self) -> VaultKvResult<StoreStatistics>;
}
