//! Tagged value envelope
//!
//! Values enter the pipeline either as structured JSON or as opaque bytes.
//! The envelope starts with a one-byte format tag so that decoding never has
//! to sniff the payload: binary data that happens to be valid UTF-8 JSON still
//! round-trips as bytes.

use crate::common::{VaultKvError, VaultKvResult};
use serde_json::Value as JsonValue;

const TAG_JSON: u8 = b'J';
const TAG_BINARY: u8 = b'B';

/// A value accepted by the store: structured JSON or an opaque byte blob.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Structured value (numbers, strings, bools, null, arrays, maps)
    Json(JsonValue),
    /// Opaque binary blob
    Bytes(Vec<u8>),
}

impl StoredValue {
    /// Returns the JSON value if this is the structured form
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            StoredValue::Json(v) => Some(v),
            StoredValue::Bytes(_) => None,
        }
    }

    /// Returns the raw bytes if this is the binary form
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StoredValue::Json(_) => None,
            StoredValue::Bytes(b) => Some(b),
        }
    }
}

impl From<JsonValue> for StoredValue {
    fn from(value: JsonValue) -> Self {
        StoredValue::Json(value)
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(bytes: Vec<u8>) -> Self {
        StoredValue::Bytes(bytes)
    }
}

/// Encodes a value into the tagged envelope
pub fn encode_value(value: &StoredValue) -> VaultKvResult<Vec<u8>> {
    match value {
        StoredValue::Json(v) => {
            let body = serde_json::to_vec(v)
                .map_err(|e| VaultKvError::Serialization(format!("JSON encode failed: {}", e)))?;
            let mut out = Vec::with_capacity(1 + body.len());
            out.push(TAG_JSON);
            out.extend_from_slice(&body);
            Ok(out)
        }
        StoredValue::Bytes(b) => {
            let mut out = Vec::with_capacity(1 + b.len());
            out.push(TAG_BINARY);
            out.extend_from_slice(b);
            Ok(out)
        }
    }
}

/// Decodes a tagged envelope back into a value
pub fn decode_value(data: &[u8]) -> VaultKvResult<StoredValue> {
    let (&tag, body) = data
        .split_first()
        .ok_or_else(|| VaultKvError::Serialization("empty envelope".to_string()))?;

    match tag {
        TAG_JSON => serde_json::from_slice(body)
            .map(StoredValue::Json)
            .map_err(|e| VaultKvError::Serialization(format!("JSON decode failed: {}", e))),
        TAG_BINARY => Ok(StoredValue::Bytes(body.to_vec())),
        other => Err(VaultKvError::Serialization(format!(
            "unknown format tag: 0x{:02x}",
            other
        ))),
    }
}
