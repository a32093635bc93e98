//! Filesystem storage backend
//!
//! Payload bytes live one-file-per-key under a content directory; a SQLite
//! catalog holds the metadata rows. Every catalog access opens a short-lived
//! connection, performs one statement (or a small fixed sequence), and closes
//! it. No pooling, no transactions spanning multiple backend calls.
//!
//! Payload files are named by the SHA-256 of the key, so caller-chosen keys
//! containing path separators cannot escape the content directory. The
//! catalog maps key → file path.

use crate::common::{VaultKvError, VaultKvResult};
use crate::store::pipeline::ValuePipeline;
use crate::store::{
    EntryMetadata, KeyAccessCount, StorageBackend, StoreStatistics, StoredValue,
    TOP_ACCESSED_LIMIT,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filesystem + SQLite-catalog storage backend
pub struct FilesystemStore {
    db_path: PathBuf,
    data_dir: PathBuf,
    pipeline: ValuePipeline,
}

/// One catalog row: entry metadata plus the payload file location
struct CatalogRow {
    metadata: EntryMetadata,
    file_path: PathBuf,
}

impl FilesystemStore {
    /// Creates the content directory and catalog table if needed
    pub fn new(
        db_path: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        pipeline: ValuePipeline,
    ) -> VaultKvResult<Self> {
        let store = Self {
            db_path: db_path.into(),
            data_dir: data_dir.into(),
            pipeline,
        };
        std::fs::create_dir_all(&store.data_dir)?;
        store.init_catalog()?;
        Ok(store)
    }

    fn init_catalog(&self) -> VaultKvResult<()> {
        let conn = self.open_catalog()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_metadata (
                key TEXT PRIMARY KEY,
                file_path TEXT NOT NULL,
                encrypted INTEGER NOT NULL,
                compressed INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    fn open_catalog(&self) -> VaultKvResult<Connection> {
        Connection::open(&self.db_path).map_err(|e| {
            VaultKvError::Catalog(format!(
                "failed to open catalog {}: {}",
                self.db_path.display(),
                e
            ))
        })
    }

    /// Payload file for `key`, named by the key's SHA-256 digest
    fn payload_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.data_dir.join(format!("{}.dat", hex::encode(digest)))
    }

    fn read_row(&self, conn: &Connection, key: &str) -> VaultKvResult<Option<CatalogRow>> {
        let mut stmt = conn.prepare(
            "SELECT key, file_path, encrypted, compressed, size_bytes,
                    created_at, updated_at, access_count
             FROM kv_metadata WHERE key = ?1",
        )?;
        let row = stmt
            .query_row(params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((key, file_path, encrypted, compressed, size_bytes, created, updated, count)) => {
                Ok(Some(CatalogRow {
                    metadata: EntryMetadata {
                        key,
                        encrypted,
                        compressed,
                        size_bytes: size_bytes as u64,
                        created_at: parse_timestamp(&created)?,
                        updated_at: parse_timestamp(&updated)?,
                        access_count: count as u64,
                    },
                    file_path: PathBuf::from(file_path),
                }))
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> VaultKvResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VaultKvError::Metadata(format!("malformed timestamp {}: {}", raw, e)))
}

impl StorageBackend for FilesystemStore {
    fn store(
        &self,
        key: &str,
        value: &StoredValue,
        encrypt: bool,
        compress: bool,
    ) -> VaultKvResult<EntryMetadata> {
        let payload = self.pipeline.encode(value, encrypt, compress)?;
        let file_path = self.payload_path(key);
        std::fs::write(&file_path, &payload.data)?;
        debug!(key, size = payload.data.len(), "stored payload file");

        let now = Utc::now();
        let conn = self.open_catalog()?;
        conn.execute(
            "INSERT INTO kv_metadata
                 (key, file_path, encrypted, compressed, size_bytes,
                  created_at, updated_at, access_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 0)
             ON CONFLICT(key) DO UPDATE SET
                 file_path = excluded.file_path,
                 encrypted = excluded.encrypted,
                 compressed = excluded.compressed,
                 size_bytes = excluded.size_bytes,
                 updated_at = excluded.updated_at",
            params![
                key,
                file_path.to_string_lossy(),
                payload.encrypted,
                payload.compressed,
                payload.data.len() as i64,
                now.to_rfc3339(),
            ],
        )?;

        let row = self.read_row(&conn, key)?.ok_or_else(|| {
            VaultKvError::Catalog(format!("metadata row missing after upsert for key {}", key))
        })?;
        Ok(row.metadata)
    }

    fn retrieve(&self, key: &str) -> VaultKvResult<Option<(StoredValue, EntryMetadata)>> {
        let conn = self.open_catalog()?;
        let Some(row) = self.read_row(&conn, key)? else {
            return Ok(None);
        };
        if !row.file_path.exists() {
            warn!(key, "catalog row without payload file; treating as absent");
            return Ok(None);
        }

        let data = std::fs::read(&row.file_path)?;
        let value = self
            .pipeline
            .decode(&data, row.metadata.encrypted, row.metadata.compressed)?;

        conn.execute(
            "UPDATE kv_metadata SET access_count = access_count + 1 WHERE key = ?1",
            params![key],
        )?;

        let mut metadata = row.metadata;
        metadata.access_count += 1;
        Ok(Some((value, metadata)))
    }

    fn delete(&self, key: &str) -> VaultKvResult<bool> {
        let conn = self.open_catalog()?;
        let Some(row) = self.read_row(&conn, key)? else {
            return Ok(false);
        };
        if row.file_path.exists() {
            std::fs::remove_file(&row.file_path)?;
        }
        conn.execute("DELETE FROM kv_metadata WHERE key = ?1", params![key])?;
        Ok(true)
    }

    fn list_keys(&self) -> VaultKvResult<Vec<String>> {
        let conn = self.open_catalog()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_metadata ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn get_stats(&self) -> VaultKvResult<StoreStatistics> {
        let conn = self.open_catalog()?;

        let (total_keys, total_size_bytes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM kv_metadata",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let encrypted_keys: i64 = conn.query_row(
            "SELECT COUNT(*) FROM kv_metadata WHERE encrypted = 1",
            [],
            |row| row.get(0),
        )?;
        let compressed_keys: i64 = conn.query_row(
            "SELECT COUNT(*) FROM kv_metadata WHERE compressed = 1",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT key, access_count FROM kv_metadata
             ORDER BY access_count DESC, key LIMIT ?1",
        )?;
        let top_accessed_keys = stmt
            .query_map(params![TOP_ACCESSED_LIMIT as i64], |row| {
                Ok(KeyAccessCount {
                    key: row.get(0)?,
                    access_count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreStatistics {
            total_keys: total_keys as u64,
            total_size_bytes: total_size_bytes as u64,
            encrypted_keys: encrypted_keys as u64,
            compressed_keys: compressed_keys as u64,
            top_accessed_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CompressionAlgorithm, CompressionCodec, EncryptionCodec};
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> FilesystemStore {
        let pipeline = ValuePipeline::new(
            CompressionCodec::new(CompressionAlgorithm::Lz4),
            EncryptionCodec::new("fs-test-pw", b"filesystem-salt!").unwrap(),
        );
        FilesystemStore::new(
            dir.path().join("catalog.db"),
            dir.path().join("data"),
            pipeline,
        )
        .unwrap()
    }

    #[test]
    fn test_payload_file_named_by_digest() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store
            .store(
                "../escape/attempt",
                &StoredValue::Bytes(vec![1]),
                false,
                false,
            )
            .unwrap();
        // The payload must land inside the content directory.
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("data"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_metadata_size_is_stored_size() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let value = StoredValue::Json(json!({"k": "v".repeat(1000)}));
        let metadata = store.store("sized", &value, true, true).unwrap();

        let on_disk = std::fs::read(store.payload_path("sized")).unwrap();
        assert_eq!(metadata.size_bytes, on_disk.len() as u64);
    }

    #[test]
    fn test_missing_payload_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store
            .store("orphan", &StoredValue::Bytes(vec![1, 2]), false, false)
            .unwrap();
        std::fs::remove_file(store.payload_path("orphan")).unwrap();
        assert!(store.retrieve("orphan").unwrap().is_none());
    }
}
