//! Redis storage backend
//!
//! Each key maps to two entries in the cache: a string `<ns>:data:<key>`
//! holding the pipeline output and a hash `<ns>:meta:<key>` holding the
//! metadata fields. Key enumeration and statistics walk the metadata
//! namespace with cursor-paginated SCAN, never KEYS. `access_count` is an
//! atomic HINCRBY on the metadata hash.

use crate::common::{VaultKvError, VaultKvResult};
use crate::store::pipeline::ValuePipeline;
use crate::store::{
    EntryMetadata, KeyAccessCount, StorageBackend, StoreStatistics, StoredValue,
    TOP_ACCESSED_LIMIT,
};
use chrono::{DateTime, Utc};
use redis::{Client, Commands, Connection};
use std::collections::HashMap;
use tracing::debug;

const SCAN_BATCH: usize = 500;

/// Redis storage backend with namespaced data/meta entries per key
pub struct RedisStore {
    client: Client,
    namespace: String,
    pipeline: ValuePipeline,
}

impl RedisStore {
    /// Creates a store for the given connection URL and key namespace.
    ///
    /// The URL is validated here; the actual connection is established per
    /// operation and released when the operation completes.
    pub fn new(url: &str, namespace: &str, pipeline: ValuePipeline) -> VaultKvResult<Self> {
        let client = Client::open(url)
            .map_err(|e| VaultKvError::Config(format!("invalid redis url {}: {}", url, e)))?;
        Ok(Self {
            client,
            namespace: namespace.to_string(),
            pipeline,
        })
    }

    fn connect(&self) -> VaultKvResult<Connection> {
        self.client.get_connection().map_err(|e| {
            VaultKvError::BackendUnavailable(format!("redis connection failed: {}", e))
        })
    }

    fn data_key(&self, key: &str) -> String {
        format!("{}:data:{}", self.namespace, key)
    }

    fn meta_key(&self, key: &str) -> String {
        format!("{}:meta:{}", self.namespace, key)
    }

    fn meta_prefix(&self) -> String {
        format!("{}:meta:", self.namespace)
    }

    /// Walks the metadata namespace with a SCAN cursor, returning full
    /// (prefixed) metadata key names
    fn scan_meta_keys(&self, conn: &mut Connection) -> VaultKvResult<Vec<String>> {
        let pattern = format!("{}*", self.meta_prefix());
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(conn)?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }

    fn read_metadata(
        &self,
        conn: &mut Connection,
        key: &str,
    ) -> VaultKvResult<Option<EntryMetadata>> {
        let fields: HashMap<String, String> = conn.hgetall(self.meta_key(key))?;
        if fields.is_empty() {
            return Ok(None);
        }
        metadata_from_fields(key, &fields).map(Some)
    }
}

fn field_flag(fields: &HashMap<String, String>, name: &str) -> bool {
    fields.get(name).map(|v| v == "1").unwrap_or(false)
}

fn field_u64(fields: &HashMap<String, String>, name: &str) -> u64 {
    fields
        .get(name)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
}

fn field_timestamp(
    fields: &HashMap<String, String>,
    name: &str,
) -> VaultKvResult<DateTime<Utc>> {
    let raw = fields
        .get(name)
        .ok_or_else(|| VaultKvError::Metadata(format!("metadata field {} missing", name)))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VaultKvError::Metadata(format!("malformed timestamp {}: {}", raw, e)))
}

fn metadata_from_fields(
    key: &str,
    fields: &HashMap<String, String>,
) -> VaultKvResult<EntryMetadata> {
    Ok(EntryMetadata {
        key: key.to_string(),
        encrypted: field_flag(fields, "encrypted"),
        compressed: field_flag(fields, "compressed"),
        size_bytes: field_u64(fields, "size_bytes"),
        created_at: field_timestamp(fields, "created_at")?,
        updated_at: field_timestamp(fields, "updated_at")?,
        access_count: field_u64(fields, "access_count"),
    })
}

impl StorageBackend for RedisStore {
    fn store(
        &self,
        key: &str,
        value: &StoredValue,
        encrypt: bool,
        compress: bool,
    ) -> VaultKvResult<EntryMetadata> {
        let payload = self.pipeline.encode(value, encrypt, compress)?;
        let mut conn = self.connect()?;
        let now = Utc::now();
        let data_key = self.data_key(key);
        let meta_key = self.meta_key(key);

        conn.set::<_, _, ()>(&data_key, payload.data.as_slice())?;
        debug!(key, size = payload.data.len(), "stored payload entry");

        // created_at survives overwrites; everything else is replaced
        let _: bool = conn.hset_nx(&meta_key, "created_at", now.to_rfc3339())?;
        redis::pipe()
            .hset(&meta_key, "encrypted", payload.encrypted as i64)
            .ignore()
            .hset(&meta_key, "compressed", payload.compressed as i64)
            .ignore()
            .hset(&meta_key, "size_bytes", payload.data.len() as i64)
            .ignore()
            .hset(&meta_key, "updated_at", now.to_rfc3339())
            .ignore()
            .query::<()>(&mut conn)?;

        let metadata = self.read_metadata(&mut conn, key)?.ok_or_else(|| {
            VaultKvError::Metadata(format!("metadata entry missing after store for key {}", key))
        })?;
        Ok(metadata)
    }

    fn retrieve(&self, key: &str) -> VaultKvResult<Option<(StoredValue, EntryMetadata)>> {
        let mut conn = self.connect()?;
        let data: Option<Vec<u8>> = conn.get(self.data_key(key))?;
        let Some(data) = data else {
            return Ok(None);
        };
        let Some(mut metadata) = self.read_metadata(&mut conn, key)? else {
            return Ok(None);
        };

        let value = self
            .pipeline
            .decode(&data, metadata.encrypted, metadata.compressed)?;

        let new_count: i64 = conn.hincr(self.meta_key(key), "access_count", 1)?;
        metadata.access_count = new_count as u64;
        Ok(Some((value, metadata)))
    }

    fn delete(&self, key: &str) -> VaultKvResult<bool> {
        let mut conn = self.connect()?;
        let removed: i64 = conn.del(self.data_key(key))?;
        let _: i64 = conn.del(self.meta_key(key))?;
        Ok(removed > 0)
    }

    fn list_keys(&self) -> VaultKvResult<Vec<String>> {
        let mut conn = self.connect()?;
        let prefix = self.meta_prefix();
        let mut keys: Vec<String> = self
            .scan_meta_keys(&mut conn)?
            .into_iter()
            .map(|full| full[prefix.len()..].to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn get_stats(&self) -> VaultKvResult<StoreStatistics> {
        let mut conn = self.connect()?;
        let prefix = self.meta_prefix();
        let meta_keys = self.scan_meta_keys(&mut conn)?;

        let mut stats = StoreStatistics::default();
        let mut access_counts = Vec::with_capacity(meta_keys.len());

        for full in meta_keys {
            let fields: HashMap<String, String> = conn.hgetall(&full)?;
            if fields.is_empty() {
                continue;
            }
            stats.total_keys += 1;
            stats.total_size_bytes += field_u64(&fields, "size_bytes");
            if field_flag(&fields, "encrypted") {
                stats.encrypted_keys += 1;
            }
            if field_flag(&fields, "compressed") {
                stats.compressed_keys += 1;
            }
            access_counts.push(KeyAccessCount {
                key: full[prefix.len()..].to_string(),
                access_count: field_u64(&fields, "access_count"),
            });
        }

        access_counts.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        access_counts.truncate(TOP_ACCESSED_LIMIT);
        stats.top_accessed_keys = access_counts;
        Ok(stats)
    }
}
