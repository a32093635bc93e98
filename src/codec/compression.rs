//! Byte-stream compression codec
//!
//! Supports three general-purpose compressors with different speed/ratio
//! trade-offs: LZ4 (frame format, fastest), Gzip, and Zstd. The codec never
//! tries to detect whether data is compressed; the persisted metadata flag is
//! the only source of truth.

use crate::common::{VaultKvError, VaultKvResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

/// Supported compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    /// LZ4 frame format (fast, moderate ratio)
    Lz4,
    /// Gzip / DEFLATE
    Gzip,
    /// Zstandard (best ratio)
    Zstd,
}

impl CompressionAlgorithm {
    /// Returns the lowercase name of this algorithm
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Lz4 => "lz4",
            CompressionAlgorithm::Gzip => "gzip",
            CompressionAlgorithm::Zstd => "zstd",
        }
    }

    /// Parses an algorithm name (case-insensitive)
    pub fn from_name(name: &str) -> VaultKvResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "gzip" => Ok(CompressionAlgorithm::Gzip),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            other => Err(VaultKvError::Config(format!(
                "unsupported compression algorithm: {}",
                other
            ))),
        }
    }
}

/// Compression codec with a selectable algorithm.
///
/// `compress` and `decompress` are exact inverses for all byte strings,
/// including the empty string.
#[derive(Debug, Clone, Copy)]
pub struct CompressionCodec {
    algorithm: CompressionAlgorithm,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::Lz4)
    }
}

impl CompressionCodec {
    /// Creates a codec using the given algorithm
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Returns the configured algorithm
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Returns all supported algorithms
    pub fn supported_algorithms() -> &'static [CompressionAlgorithm] {
        &[
            CompressionAlgorithm::Lz4,
            CompressionAlgorithm::Gzip,
            CompressionAlgorithm::Zstd,
        ]
    }

    /// Compresses data with the configured algorithm
    pub fn compress(&self, data: &[u8]) -> VaultKvResult<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::Lz4 => {
                let mut encoder = lz4::EncoderBuilder::new()
                    .build(Vec::new())
                    .map_err(|e| {
                        VaultKvError::Compression(format!("lz4 encoder init failed: {}", e))
                    })?;
                encoder
                    .write_all(data)
                    .map_err(|e| VaultKvError::Compression(format!("lz4 compression failed: {}", e)))?;
                let (out, result) = encoder.finish();
                result.map_err(|e| {
                    VaultKvError::Compression(format!("lz4 compression failed: {}", e))
                })?;
                Ok(out)
            }
            CompressionAlgorithm::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(data)
                    .map_err(|e| VaultKvError::Compression(format!("gzip compression failed: {}", e)))?;
                encoder
                    .finish()
                    .map_err(|e| VaultKvError::Compression(format!("gzip compression failed: {}", e)))
            }
            CompressionAlgorithm::Zstd => zstd::stream::encode_all(data, 0)
                .map_err(|e| VaultKvError::Compression(format!("zstd compression failed: {}", e))),
        }
    }

    /// Decompresses data with the configured algorithm.
    ///
    /// Malformed or truncated input is a `Compression` error.
    pub fn decompress(&self, data: &[u8]) -> VaultKvResult<Vec<u8>> {
        match self.algorithm {
            CompressionAlgorithm::Lz4 => {
                let mut decoder = lz4::Decoder::new(data).map_err(|e| {
                    VaultKvError::Compression(format!("lz4 decompression failed: {}", e))
                })?;
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(|e| {
                    VaultKvError::Compression(format!("lz4 decompression failed: {}", e))
                })?;
                Ok(out)
            }
            CompressionAlgorithm::Gzip => {
                let mut decoder = GzDecoder::new(data);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(|e| {
                    VaultKvError::Compression(format!("gzip decompression failed: {}", e))
                })?;
                Ok(out)
            }
            CompressionAlgorithm::Zstd => zstd::stream::decode_all(data)
                .map_err(|e| VaultKvError::Compression(format!("zstd decompression failed: {}", e))),
        }
    }

    /// Returns `len(compressed) / len(original)`, or `0.0` for empty input
    pub fn compression_ratio(&self, original: &[u8], compressed: &[u8]) -> f64 {
        if original.is_empty() {
            return 0.0;
        }
        compressed.len() as f64 / original.len() as f64
    }
}
