//! Redis-backed pattern analyzer
//!
//! Aggregates are maintained incrementally in Redis structures instead of an
//! event log: a hash of operation counts, a hash of global totals, a sorted
//! set of per-key access counts, and one small hash of totals per key.
//! Counters use the server's atomic increments; the min/max response-time
//! fields are updated through a Lua script so concurrent writers cannot lose
//! updates. This variant omits the per-day histogram and recent-event log
//! that the SQLite analyzer provides.

use crate::analyzer::{
    generate_recommendations, AccessPatternStats, AnalysisReport, CompressionStats,
    EncryptionStats, KeyInsights, Operation, PatternAnalyzer, ResponseTimeStats, TopAccessedKey,
};
use crate::common::{VaultKvError, VaultKvResult};
use crate::store::StorageBackend;
use chrono::{DateTime, Utc};
use redis::{Client, Commands, Connection, Script};
use std::collections::{BTreeMap, HashMap};

const TOP_KEYS_LIMIT: isize = 10;

/// Updates the min_ms/max_ms fields of a stats hash in one atomic step
const MINMAX_SCRIPT: &str = r#"
local sample = tonumber(ARGV[1])
local min = redis.call('HGET', KEYS[1], 'min_ms')
if not min or sample < tonumber(min) then
  redis.call('HSET', KEYS[1], 'min_ms', ARGV[1])
end
local max = redis.call('HGET', KEYS[1], 'max_ms')
if not max or sample > tonumber(max) then
  redis.call('HSET', KEYS[1], 'max_ms', ARGV[1])
end
return 0
"#;

/// Pattern analyzer keeping incremental aggregates in Redis
pub struct RedisPatternAnalyzer {
    client: Client,
    namespace: String,
    minmax_script: Script,
}

impl RedisPatternAnalyzer {
    /// Creates an analyzer under the given namespace (conventionally distinct
    /// from the store's, e.g. `kv:pa`)
    pub fn new(url: &str, namespace: &str) -> VaultKvResult<Self> {
        let client = Client::open(url)
            .map_err(|e| VaultKvError::Config(format!("invalid redis url {}: {}", url, e)))?;
        Ok(Self {
            client,
            namespace: namespace.to_string(),
            minmax_script: Script::new(MINMAX_SCRIPT),
        })
    }

    fn connect(&self) -> VaultKvResult<Connection> {
        self.client.get_connection().map_err(|e| {
            VaultKvError::BackendUnavailable(format!("redis connection failed: {}", e))
        })
    }

    fn ops_key(&self) -> String {
        format!("{}:ops", self.namespace)
    }

    fn stats_key(&self) -> String {
        format!("{}:stats", self.namespace)
    }

    fn top_key(&self) -> String {
        format!("{}:top", self.namespace)
    }

    fn key_stats_key(&self, key: &str) -> String {
        format!("{}:keystats:{}", self.namespace, key)
    }
}

fn field_u64(fields: &HashMap<String, String>, name: &str) -> u64 {
    fields
        .get(name)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
}

fn field_f64(fields: &HashMap<String, String>, name: &str) -> f64 {
    fields
        .get(name)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn field_timestamp(fields: &HashMap<String, String>, name: &str) -> Option<DateTime<Utc>> {
    fields
        .get(name)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}

impl PatternAnalyzer for RedisPatternAnalyzer {
    fn record_access(
        &self,
        key: &str,
        operation: Operation,
        response_time_ms: f64,
        data_size: u64,
    ) -> VaultKvResult<()> {
        let mut conn = self.connect()?;
        let stats_key = self.stats_key();
        let key_stats_key = self.key_stats_key(key);
        let now = Utc::now().to_rfc3339();

        let mut pipe = redis::pipe();
        pipe.hincr(self.ops_key(), operation.as_str(), 1)
            .ignore()
            .hincr(&stats_key, "total_accesses", 1)
            .ignore()
            .zincr(self.top_key(), key, 1)
            .ignore()
            .hincr(&key_stats_key, "total_accesses", 1)
            .ignore()
            .hset(&key_stats_key, "last_access", &now)
            .ignore();

        // Zero means "not measured": keep it out of every aggregate.
        if response_time_ms > 0.0 {
            pipe.cmd("HINCRBYFLOAT")
                .arg(&stats_key)
                .arg("total_response_time_ms")
                .arg(response_time_ms)
                .ignore()
                .hincr(&stats_key, "response_time_samples", 1)
                .ignore()
                .cmd("HINCRBYFLOAT")
                .arg(&key_stats_key)
                .arg("total_response_time_ms")
                .arg(response_time_ms)
                .ignore()
                .hincr(&key_stats_key, "response_time_samples", 1)
                .ignore();
        }
        if data_size > 0 {
            pipe.hincr(&stats_key, "total_data_size", data_size as i64)
                .ignore()
                .hincr(&key_stats_key, "total_data_size", data_size as i64)
                .ignore()
                .hincr(&key_stats_key, "data_size_samples", 1)
                .ignore();
        }
        pipe.query::<()>(&mut conn)?;

        if response_time_ms > 0.0 {
            self.minmax_script
                .key(&stats_key)
                .arg(response_time_ms)
                .invoke::<i64>(&mut conn)?;
            self.minmax_script
                .key(&key_stats_key)
                .arg(response_time_ms)
                .invoke::<i64>(&mut conn)?;
        }
        Ok(())
    }

    fn analyze_patterns(&self, backend: &dyn StorageBackend) -> VaultKvResult<AnalysisReport> {
        let mut conn = self.connect()?;

        let stats: HashMap<String, String> = conn.hgetall(self.stats_key())?;
        let total_accesses = field_u64(&stats, "total_accesses");
        let samples = field_u64(&stats, "response_time_samples");
        let response_time_stats = ResponseTimeStats {
            avg_ms: if samples > 0 {
                field_f64(&stats, "total_response_time_ms") / samples as f64
            } else {
                0.0
            },
            min_ms: field_f64(&stats, "min_ms"),
            max_ms: field_f64(&stats, "max_ms"),
        };

        let ops: HashMap<String, u64> = conn.hgetall(self.ops_key())?;
        let operation_distribution: BTreeMap<String, u64> = ops.into_iter().collect();

        let unique_keys_accessed: u64 = conn.zcard(self.top_key())?;

        let ranked: Vec<(String, f64)> =
            conn.zrevrange_withscores(self.top_key(), 0, TOP_KEYS_LIMIT - 1)?;
        let mut top_accessed_keys = Vec::with_capacity(ranked.len());
        for (key, score) in ranked {
            let key_stats: HashMap<String, String> = conn.hgetall(self.key_stats_key(&key))?;
            top_accessed_keys.push(TopAccessedKey {
                last_access: field_timestamp(&key_stats, "last_access"),
                key,
                access_count: score as u64,
            });
        }

        let store_stats = backend.get_stats()?;
        let recommendations = generate_recommendations(
            &operation_distribution,
            &top_accessed_keys,
            &store_stats,
            response_time_stats.avg_ms,
        );

        let total_keys = store_stats.total_keys;
        let compression_stats = CompressionStats {
            compressed_keys: store_stats.compressed_keys,
            compression_ratio: store_stats.compressed_keys as f64 / total_keys.max(1) as f64,
        };
        let encryption_stats = EncryptionStats {
            encrypted_keys: store_stats.encrypted_keys,
            encryption_ratio: store_stats.encrypted_keys as f64 / total_keys.max(1) as f64,
        };

        Ok(AnalysisReport {
            total_keys,
            access_patterns: AccessPatternStats {
                total_accesses,
                unique_keys_accessed,
                operation_distribution,
                top_accessed_keys,
                daily_access_counts: None,
                recent_access_history: None,
                response_time_stats,
            },
            compression_stats,
            encryption_stats,
            recommendations,
        })
    }

    fn get_key_insights(&self, key: &str) -> VaultKvResult<KeyInsights> {
        let mut conn = self.connect()?;
        let fields: HashMap<String, String> = conn.hgetall(self.key_stats_key(key))?;

        let total_accesses = field_u64(&fields, "total_accesses");
        let samples = field_u64(&fields, "response_time_samples");
        let size_samples = field_u64(&fields, "data_size_samples");

        Ok(KeyInsights {
            key: key.to_string(),
            total_accesses,
            avg_response_time_ms: if samples > 0 {
                field_f64(&fields, "total_response_time_ms") / samples as f64
            } else {
                0.0
            },
            min_response_time_ms: field_f64(&fields, "min_ms"),
            max_response_time_ms: field_f64(&fields, "max_ms"),
            avg_data_size: if size_samples > 0 {
                field_u64(&fields, "total_data_size") as f64 / size_samples as f64
            } else {
                0.0
            },
            // Individual events are not retained in Redis to save space.
            access_history: None,
        })
    }
}
