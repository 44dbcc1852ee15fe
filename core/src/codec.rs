//! Payload encoding for cross-chain messages.
//!
//! Payloads are serialized with `bincode` using fixed-width integers, a size
//! limit, and strict trailing-byte rejection, so bytes that were encoded for
//! a different payload kind fail to decode instead of half-decoding.

use bincode::Options;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Largest payload accepted from the wire, in bytes
pub const MAX_PAYLOAD_BYTES: u64 = 64 * 1024;

/// Errors from payload encoding and decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to serialize a payload
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// Failed to deserialize a payload
    #[error("failed to decode payload: {0}")]
    Decode(String),
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_BYTES)
        .reject_trailing_bytes()
}

/// Encode a payload to bytes
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the value cannot be serialized or exceeds
/// [`MAX_PAYLOAD_BYTES`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    options()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a payload from bytes
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed, oversized or trailing input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    options()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}
