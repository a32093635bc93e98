use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use vaultkv::{
    CompressionAlgorithm, CompressionCodec, EncryptionCodec, FilesystemStore, StorageBackend,
    StoredValue, ValuePipeline, VaultKvError, VaultKvResult,
};

const TEST_SALT: &[u8] = b"integration-salt";

fn open_store(dir: &std::path::Path, passphrase: &str) -> VaultKvResult<FilesystemStore> {
    let pipeline = ValuePipeline::new(
        CompressionCodec::new(CompressionAlgorithm::Lz4),
        EncryptionCodec::new(passphrase, TEST_SALT)?,
    );
    FilesystemStore::new(dir.join("catalog.db"), dir.join("data"), pipeline)
}

#[test]
fn test_round_trip_all_flag_combinations() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    let json_value = StoredValue::Json(json!({"name": "alice", "scores": [1, 2, 3]}));
    let binary_value = StoredValue::Bytes(b"\x00\xff\x10raw".to_vec());
    let empty_value = StoredValue::Bytes(Vec::new());

    for (i, value) in [&json_value, &binary_value, &empty_value].iter().enumerate() {
        for (j, (encrypt, compress)) in [(false, false), (false, true), (true, false), (true, true)]
            .iter()
            .enumerate()
        {
            let key = format!("rt-{}-{}", i, j);
            let metadata = store.store(&key, value, *encrypt, *compress)?;
            assert_eq!(metadata.encrypted, *encrypt);
            assert_eq!(metadata.compressed, *compress);

            let (retrieved, _) = store.retrieve(&key)?.unwrap();
            assert_eq!(&retrieved, *value);
        }
    }
    Ok(())
}

#[test]
fn test_overwrite_replaces_value_and_preserves_history() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    let first = store.store("doc", &StoredValue::Json(json!({"v": 1})), true, true)?;
    // Bump access_count so we can observe it surviving the overwrite.
    store.retrieve("doc")?;
    store.retrieve("doc")?;

    let second = store.store("doc", &StoredValue::Json(json!({"v": 2})), false, false)?;
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.access_count, 2);
    assert!(!second.encrypted);
    assert!(!second.compressed);

    let (value, _) = store.retrieve("doc")?.unwrap();
    assert_eq!(value, StoredValue::Json(json!({"v": 2})));
    Ok(())
}

#[test]
fn test_missing_key_is_not_an_error() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    assert!(store.retrieve("ghost")?.is_none());
    assert!(!store.delete("ghost")?);
    Ok(())
}

#[test]
fn test_delete_removes_value_and_metadata() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    store.store("gone", &StoredValue::Bytes(vec![1, 2, 3]), true, false)?;
    assert!(store.delete("gone")?);
    assert!(store.retrieve("gone")?.is_none());
    assert!(store.list_keys()?.is_empty());

    let data_dir: Vec<_> = std::fs::read_dir(dir.path().join("data")).unwrap().collect();
    assert!(data_dir.is_empty());
    Ok(())
}

#[test]
fn test_list_keys_sorted() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    for key in ["zulu", "alpha", "mike"] {
        store.store(key, &StoredValue::Bytes(vec![0]), false, false)?;
    }
    assert_eq!(store.list_keys()?, vec!["alpha", "mike", "zulu"]);
    Ok(())
}

#[test]
fn test_stats_reflect_flags_and_access_counts() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path(), "pw")?;

    store.store("a", &StoredValue::Json(json!("x")), true, true)?;
    store.store("b", &StoredValue::Json(json!("y")), true, false)?;
    store.store("c", &StoredValue::Json(json!("z")), false, false)?;
    store.retrieve("b")?;
    store.retrieve("b")?;
    store.retrieve("a")?;

    let stats = store.get_stats()?;
    assert_eq!(stats.total_keys, 3);
    assert_eq!(stats.encrypted_keys, 2);
    assert_eq!(stats.compressed_keys, 1);
    assert!(stats.total_size_bytes > 0);

    assert_eq!(stats.top_accessed_keys[0].key, "b");
    assert_eq!(stats.top_accessed_keys[0].access_count, 2);
    assert_eq!(stats.top_accessed_keys[1].key, "a");
    Ok(())
}

#[test]
fn test_store_persists_across_reopen() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    {
        let store = open_store(dir.path(), "pw")?;
        store.store("durable", &StoredValue::Json(json!({"kept": true})), true, true)?;
    }
    let store = open_store(dir.path(), "pw")?;
    let (value, metadata) = store.retrieve("durable")?.unwrap();
    assert_eq!(value, StoredValue::Json(json!({"kept": true})));
    assert!(metadata.encrypted);
    Ok(())
}

#[test]
fn test_wrong_passphrase_fails_closed() -> VaultKvResult<()> {
    let dir = tempdir().unwrap();
    {
        let store = open_store(dir.path(), "correct horse")?;
        store.store("secret", &StoredValue::Bytes(b"battery staple".to_vec()), true, false)?;
    }
    let store = open_store(dir.path(), "wrong horse")?;
    match store.retrieve("secret") {
        Err(VaultKvError::Decryption(_)) => Ok(()),
        other => panic!("expected decryption failure, got {:?}", other),
    }
}
