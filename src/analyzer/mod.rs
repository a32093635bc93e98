//! Access-pattern analytics
//!
//! Records every store/retrieve/delete outcome as an access event and derives
//! usage statistics and heuristic recommendations. The analyzer never touches
//! raw values (only key names, operation kinds, timings, and sizes) and
//! holds no reference to a storage backend: `analyze_patterns` takes the
//! backend as a parameter when it needs current store statistics.

pub mod redis;
pub mod sqlite;

pub use redis::RedisPatternAnalyzer;
pub use sqlite::SqlitePatternAnalyzer;

use crate::common::{VaultKvError, VaultKvResult};
use crate::store::{StorageBackend, StoreStatistics};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of access being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl Operation {
    /// Lowercase wire name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
        }
    }

    /// Parses a wire name back into an operation
    pub fn parse(name: &str) -> VaultKvResult<Self> {
        match name {
            "read" => Ok(Operation::Read),
            "write" => Ok(Operation::Write),
            "delete" => Ok(Operation::Delete),
            other => Err(VaultKvError::Metadata(format!(
                "unknown operation: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded access. `response_time_ms == 0.0` / `data_size == 0` mean
/// "not measured" and are excluded from numeric aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessEvent {
    pub key: String,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: f64,
    pub data_size: u64,
}

/// Response-time aggregate over measured samples only
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseTimeStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// One of the most-accessed keys, with its last access time where tracked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopAccessedKey {
    pub key: String,
    pub access_count: u64,
    pub last_access: Option<DateTime<Utc>>,
}

/// The access-pattern block of an [`AnalysisReport`].
///
/// `daily_access_counts` and `recent_access_history` are optional
/// enrichments: the SQLite analyzer provides them, the Redis analyzer omits
/// them to save space.
#[derive(Debug, Clone, Serialize)]
pub struct AccessPatternStats {
    pub total_accesses: u64,
    pub unique_keys_accessed: u64,
    pub operation_distribution: BTreeMap<String, u64>,
    pub top_accessed_keys: Vec<TopAccessedKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_access_counts: Option<BTreeMap<String, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_access_history: Option<Vec<AccessEvent>>,
    pub response_time_stats: ResponseTimeStats,
}

/// Compression coverage over the current store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionStats {
    pub compressed_keys: u64,
    pub compression_ratio: f64,
}

/// Encryption coverage over the current store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptionStats {
    pub encrypted_keys: u64,
    pub encryption_ratio: f64,
}

/// Full report produced by `analyze_patterns`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub total_keys: u64,
    pub access_patterns: AccessPatternStats,
    pub compression_stats: CompressionStats,
    pub encryption_stats: EncryptionStats,
    pub recommendations: Vec<String>,
}

/// Per-key statistics returned by `get_key_insights`
#[derive(Debug, Clone, Serialize)]
pub struct KeyInsights {
    pub key: String,
    pub total_accesses: u64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub avg_data_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_history: Option<Vec<AccessEvent>>,
}

/// Common contract for both analyzer variants.
///
/// Both variants must produce equivalent reports from equivalent event
/// histories, modulo the optional enrichments noted on
/// [`AccessPatternStats`].
pub trait PatternAnalyzer: Send + Sync {
    /// Appends one access event. Pass `0.0` / `0` for unmeasured
    /// response time or size.
    fn record_access(
        &self,
        key: &str,
        operation: Operation,
        response_time_ms: f64,
        data_size: u64,
    ) -> VaultKvResult<()>;

    /// Combines accumulated events with the backend's current statistics
    fn analyze_patterns(&self, backend: &dyn StorageBackend) -> VaultKvResult<AnalysisReport>;

    /// Detailed statistics for a single key
    fn get_key_insights(&self, key: &str) -> VaultKvResult<KeyInsights>;
}

/// Evaluates the recommendation heuristics, in their fixed order
pub(crate) fn generate_recommendations(
    operation_distribution: &BTreeMap<String, u64>,
    top_keys: &[TopAccessedKey],
    store_stats: &StoreStatistics,
    avg_response_time_ms: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    let total = store_stats.total_keys.max(1) as f64;

    let compression_ratio = store_stats.compressed_keys as f64 / total;
    if compression_ratio < 0.8 {
        recommendations
            .push("Consider enabling compression for more keys to save storage space".to_string());
    }

    let encryption_ratio = store_stats.encrypted_keys as f64 / total;
    if encryption_ratio < 0.9 {
        recommendations
            .push("Consider enabling encryption for more keys to improve security".to_string());
    }

    if avg_response_time_ms > 100.0 {
        recommendations.push(
            "Average response time is high. Consider optimizing frequently accessed keys"
                .to_string(),
        );
    }

    let reads = operation_distribution.get("read").copied().unwrap_or(0);
    let writes = operation_distribution.get("write").copied().unwrap_or(0);
    if reads > writes * 3 {
        recommendations
            .push("High read-to-write ratio detected. Consider implementing caching".to_string());
    }

    let names: Vec<&str> = top_keys.iter().take(5).map(|k| k.key.as_str()).collect();
    if detect_naming_patterns(&names) {
        recommendations.push(
            "Detected consistent key naming patterns. Consider implementing key hierarchies"
                .to_string(),
        );
    }

    if store_stats.total_size_bytes > 100 * 1024 * 1024 {
        recommendations.push(
            "Large storage usage detected. Consider implementing data archival for old keys"
                .to_string(),
        );
    }

    recommendations
}

/// True when the top key names all share a separator character, or all share
/// the same prefix before the first `_`
fn detect_naming_patterns(keys: &[&str]) -> bool {
    if keys.len() < 3 {
        return false;
    }
    for sep in ['.', '_', '-', '/'] {
        if keys.iter().all(|k| k.contains(sep)) {
            return true;
        }
    }
    let mut with_sep = keys.iter().filter(|k| k.contains('_'));
    if let Some(first) = with_sep.next().and_then(|k| k.split('_').next()) {
        return with_sep.all(|k| k.split('_').next() == Some(first));
    }
    false
}
