//! Value transform pipeline
//!
//! Forward direction: serialize → compress (if requested) → encrypt (if
//! requested). Reverse direction is driven by the flags persisted with the
//! entry, never by probing the payload.

use crate::codec::serialize::{decode_value, encode_value, StoredValue};
use crate::codec::{CompressionCodec, EncryptionCodec};
use crate::common::VaultKvResult;

/// Result of running a value through the forward pipeline
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// Bytes as they will be persisted
    pub data: Vec<u8>,
    /// Whether encryption was applied
    pub encrypted: bool,
    /// Whether compression was applied
    pub compressed: bool,
}

/// The serialize/compress/encrypt pipeline shared by both backends.
///
/// Holds the two codec instances; immutable after construction.
#[derive(Clone)]
pub struct ValuePipeline {
    compression: CompressionCodec,
    encryption: EncryptionCodec,
}

impl ValuePipeline {
    /// Builds a pipeline from the two codec stages
    pub fn new(compression: CompressionCodec, encryption: EncryptionCodec) -> Self {
        Self {
            compression,
            encryption,
        }
    }

    /// Runs the forward pipeline
    pub fn encode(
        &self,
        value: &StoredValue,
        encrypt: bool,
        compress: bool,
    ) -> VaultKvResult<EncodedPayload> {
        let mut data = encode_value(value)?;
        if compress {
            data = self.compression.compress(&data)?;
        }
        if encrypt {
            data = self.encryption.encrypt(&data)?;
        }
        Ok(EncodedPayload {
            data,
            encrypted: encrypt,
            compressed: compress,
        })
    }

    /// Runs the reverse pipeline, guided by the persisted flags
    pub fn decode(
        &self,
        payload: &[u8],
        encrypted: bool,
        compressed: bool,
    ) -> VaultKvResult<StoredValue> {
        let mut data;
        if encrypted {
            data = self.encryption.decrypt(payload)?;
        } else {
            data = payload.to_vec();
        }
        if compressed {
            data = self.compression.decompress(&data)?;
        }
        decode_value(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressionAlgorithm;
    use serde_json::json;

    fn test_pipeline() -> ValuePipeline {
        ValuePipeline::new(
            CompressionCodec::new(CompressionAlgorithm::Lz4),
            EncryptionCodec::new("pipeline-test-pw", b"pipeline-salt+++").unwrap(),
        )
    }

    #[test]
    fn test_all_flag_combinations() {
        let pipeline = test_pipeline();
        let value = StoredValue::Json(json!({"user": "alice", "logins": 42}));

        for encrypt in [false, true] {
            for compress in [false, true] {
                let payload = pipeline.encode(&value, encrypt, compress).unwrap();
                assert_eq!(payload.encrypted, encrypt);
                assert_eq!(payload.compressed, compress);
                let decoded = pipeline
                    .decode(&payload.data, payload.encrypted, payload.compressed)
                    .unwrap();
                assert_eq!(decoded, value, "encrypt={} compress={}", encrypt, compress);
            }
        }
    }

    #[test]
    fn test_binary_value_through_pipeline() {
        let pipeline = test_pipeline();
        let value = StoredValue::Bytes((0u8..=255).collect());
        let payload = pipeline.encode(&value, true, true).unwrap();
        let decoded = pipeline.decode(&payload.data, true, true).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_plain_payload_is_tagged_envelope() {
        let pipeline = test_pipeline();
        let payload = pipeline
            .encode(&StoredValue::Bytes(vec![1, 2, 3]), false, false)
            .unwrap();
        assert_eq!(payload.data, vec![b'B', 1, 2, 3]);
    }
}
