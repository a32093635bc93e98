//! Value pipeline codecs
//!
//! The storage pipeline runs every value through three reversible stages:
//! serialization (tagged envelope), compression (optional, selectable
//! algorithm), and authenticated encryption (optional). Each codec is
//! immutable after construction and safe to share across threads.

pub mod compression;
pub mod encryption;
pub mod serialize;

pub use compression::{CompressionAlgorithm, CompressionCodec};
pub use encryption::{load_or_generate_salt, EncryptionCodec, SALT_LEN};
pub use serialize::{decode_value, encode_value, StoredValue};
