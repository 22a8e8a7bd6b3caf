//! Value codec for the shared store.
//!
//! Values are encoded as JSON; payloads above the configured threshold are
//! additionally zstd-compressed. A one-byte header records which format the
//! payload is in, so the threshold can change between writes.

use thiserror::Error;

use crate::cache::value::CacheValue;
use crate::config::StoreConfig;

/// Payload header: plain JSON.
const FORMAT_JSON: u8 = 0;
/// Payload header: zstd-compressed JSON.
const FORMAT_JSON_ZSTD: u8 = 1;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Zstd compression failed: {0}")]
    ZstdError(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown payload format byte {0}")]
    UnknownFormat(u8),

    #[error("Payload is empty")]
    Empty,
}

/// Encodes and decodes values at the shared-store boundary.
#[derive(Debug, Clone)]
pub struct Codec {
    compress_threshold: usize,
    zstd_level: i32,
}

impl Codec {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            compress_threshold: config.compress_threshold,
            zstd_level: config.zstd_level,
        }
    }

    /// Encode a value into a self-describing payload.
    pub fn encode(&self, value: &CacheValue) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_vec(value)?;

        if self.compress_threshold > 0 && json.len() > self.compress_threshold {
            let compressed = zstd::encode_all(json.as_slice(), self.zstd_level)?;
            let mut out = Vec::with_capacity(compressed.len() + 1);
            out.push(FORMAT_JSON_ZSTD);
            out.extend_from_slice(&compressed);
            Ok(out)
        } else {
            let mut out = Vec::with_capacity(json.len() + 1);
            out.push(FORMAT_JSON);
            out.extend_from_slice(&json);
            Ok(out)
        }
    }

    /// Decode a payload produced by [`Codec::encode`].
    pub fn decode(&self, payload: &[u8]) -> Result<CacheValue, CodecError> {
        let (&format, body) = payload.split_first().ok_or(CodecError::Empty)?;
        match format {
            FORMAT_JSON => Ok(serde_json::from_slice(body)?),
            FORMAT_JSON_ZSTD => {
                let json = zstd::decode_all(body)?;
                Ok(serde_json::from_slice(&json)?)
            }
            other => Err(CodecError::UnknownFormat(other)),
        }
    }
}
