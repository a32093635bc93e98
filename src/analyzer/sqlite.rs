//! SQLite-backed pattern analyzer
//!
//! Access events are appended to an `access_patterns` table and all
//! aggregates are recomputed in SQL at query time. Like the filesystem
//! backend's catalog, every call opens a short-lived connection and closes
//! it. This variant provides the optional enrichments: a per-day access
//! histogram and a bounded recent-event log.

use crate::analyzer::{
    generate_recommendations, AccessEvent, AccessPatternStats, AnalysisReport, CompressionStats,
    EncryptionStats, KeyInsights, Operation, PatternAnalyzer, ResponseTimeStats, TopAccessedKey,
};
use crate::common::{VaultKvError, VaultKvResult};
use crate::store::StorageBackend;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::PathBuf;

const TOP_KEYS_LIMIT: usize = 10;
const RECENT_HISTORY_LIMIT: usize = 20;
const KEY_HISTORY_LIMIT: usize = 50;

/// Pattern analyzer storing events in a SQLite database
pub struct SqlitePatternAnalyzer {
    db_path: PathBuf,
}

impl SqlitePatternAnalyzer {
    /// Opens (and initializes if needed) the analyzer database
    pub fn new(db_path: impl Into<PathBuf>) -> VaultKvResult<Self> {
        let analyzer = Self {
            db_path: db_path.into(),
        };
        let conn = analyzer.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS access_patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key_name TEXT NOT NULL,
                operation TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                response_time_ms REAL NOT NULL DEFAULT 0,
                data_size INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(analyzer)
    }

    fn open(&self) -> VaultKvResult<Connection> {
        Connection::open(&self.db_path).map_err(|e| {
            VaultKvError::Catalog(format!(
                "failed to open analyzer db {}: {}",
                self.db_path.display(),
                e
            ))
        })
    }

    fn query_events(
        &self,
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> VaultKvResult<Vec<AccessEvent>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (key, operation, timestamp, response_time_ms, data_size) = row?;
            events.push(AccessEvent {
                key,
                operation: Operation::parse(&operation)?,
                timestamp: parse_timestamp(&timestamp)?,
                response_time_ms,
                data_size: data_size as u64,
            });
        }
        Ok(events)
    }
}

fn parse_timestamp(raw: &str) -> VaultKvResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VaultKvError::Metadata(format!("malformed timestamp {}: {}", raw, e)))
}

impl PatternAnalyzer for SqlitePatternAnalyzer {
    fn record_access(
        &self,
        key: &str,
        operation: Operation,
        response_time_ms: f64,
        data_size: u64,
    ) -> VaultKvResult<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO access_patterns (key_name, operation, timestamp, response_time_ms, data_size)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                operation.as_str(),
                Utc::now().to_rfc3339(),
                response_time_ms,
                data_size as i64,
            ],
        )?;
        Ok(())
    }

    fn analyze_patterns(&self, backend: &dyn StorageBackend) -> VaultKvResult<AnalysisReport> {
        let conn = self.open()?;

        let (total_accesses, unique_keys_accessed): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT key_name) FROM access_patterns",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut operation_distribution = BTreeMap::new();
        {
            let mut stmt = conn
                .prepare("SELECT operation, COUNT(*) FROM access_patterns GROUP BY operation")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (operation, count) = row?;
                operation_distribution.insert(operation, count as u64);
            }
        }

        let mut top_accessed_keys = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT key_name, COUNT(*) AS access_count, MAX(timestamp)
                 FROM access_patterns
                 GROUP BY key_name
                 ORDER BY access_count DESC, key_name
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![TOP_KEYS_LIMIT as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (key, access_count, last) = row?;
                top_accessed_keys.push(TopAccessedKey {
                    key,
                    access_count: access_count as u64,
                    last_access: Some(parse_timestamp(&last)?),
                });
            }
        }

        // RFC 3339 UTC timestamps: the first 10 characters are the date.
        let mut daily_access_counts = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT substr(timestamp, 1, 10) AS day, COUNT(*)
                 FROM access_patterns GROUP BY day",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (day, count) = row?;
                daily_access_counts.insert(day, count as u64);
            }
        }

        let recent_access_history = self.query_events(
            &conn,
            "SELECT key_name, operation, timestamp, response_time_ms, data_size
             FROM access_patterns
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
            params![RECENT_HISTORY_LIMIT as i64],
        )?;

        // Zero means "not measured"; exclude those samples.
        let (avg_ms, min_ms, max_ms): (Option<f64>, Option<f64>, Option<f64>) = conn.query_row(
            "SELECT AVG(response_time_ms), MIN(response_time_ms), MAX(response_time_ms)
             FROM access_patterns WHERE response_time_ms > 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let response_time_stats = ResponseTimeStats {
            avg_ms: avg_ms.unwrap_or(0.0),
            min_ms: min_ms.unwrap_or(0.0),
            max_ms: max_ms.unwrap_or(0.0),
        };

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
                total_accesses: total_accesses as u64,
                unique_keys_accessed: unique_keys_accessed as u64,
                operation_distribution,
                top_accessed_keys,
                daily_access_counts: Some(daily_access_counts),
                recent_access_history: Some(recent_access_history),
                response_time_stats,
            },
            compression_stats,
            encryption_stats,
            recommendations,
        })
    }

    fn get_key_insights(&self, key: &str) -> VaultKvResult<KeyInsights> {
        let conn = self.open()?;

        let access_history = self.query_events(
            &conn,
            "SELECT key_name, operation, timestamp, response_time_ms, data_size
             FROM access_patterns
             WHERE key_name = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
            params![key, KEY_HISTORY_LIMIT as i64],
        )?;

        let (total, avg_ms, min_ms, max_ms, avg_size): (
            i64,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
        ) = conn.query_row(
            "SELECT
                 COUNT(*),
                 AVG(CASE WHEN response_time_ms > 0 THEN response_time_ms END),
                 MIN(CASE WHEN response_time_ms > 0 THEN response_time_ms END),
                 MAX(CASE WHEN response_time_ms > 0 THEN response_time_ms END),
                 AVG(CASE WHEN data_size > 0 THEN data_size END)
             FROM access_patterns WHERE key_name = ?1",
            params![key],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )?;

        Ok(KeyInsights {
            key: key.to_string(),
            total_accesses: total as u64,
            avg_response_time_ms: avg_ms.unwrap_or(0.0),
            min_response_time_ms: min_ms.unwrap_or(0.0),
            max_response_time_ms: max_ms.unwrap_or(0.0),
            avg_data_size: avg_size.unwrap_or(0.0),
            access_history: Some(access_history),
        })
    }
}
