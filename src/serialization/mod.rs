//! CBOR serialization for proposal records and store snapshots.
//!
//! - Use CBOR via `ciborium` (NOT JSON or bincode)
//! - Deterministic serialization so checksums are stable
//! - Schema evolution with #[serde(default)] on fields added later
//!
//! Snapshots are wrapped in a [`SnapshotEnvelope`] that records the schema
//! version and a SHA-256 checksum of the payload. A truncated or bit-flipped
//! snapshot is rejected on decode instead of silently restoring bad state.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Serialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// CBOR encoding failed.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("CBOR decoding failed: {0}")]
    Decode(String),

    /// Snapshot payload does not match its recorded checksum.
    #[error("snapshot checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Snapshot was written by a newer schema than this binary understands.
    #[error("unsupported snapshot schema version {found} (supported up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Serialize to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| SerializationError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Deserialize from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    ciborium::from_reader(bytes).map_err(|e| SerializationError::Decode(format!("{:?}", e)))
}

/// Versioned, checksummed wrapper around a CBOR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub schema_version: u32,
    /// Hex-encoded SHA-256 of `payload`.
    pub checksum: String,
    pub payload: Vec<u8>,
}

/// Hex-encoded SHA-256 digest.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Encode `value` and seal it in an envelope tagged with `schema_version`.
pub fn seal_snapshot<T: Serialize>(
    value: &T,
    schema_version: u32,
) -> Result<Vec<u8>, SerializationError> {
    let payload = to_cbor(value)?;
    let envelope = SnapshotEnvelope {
        schema_version,
        checksum: checksum(&payload),
        payload,
    };
    to_cbor(&envelope)
}

/// Verify and decode a sealed snapshot.
///
/// Returns the schema version it was written with alongside the value.
pub fn open_snapshot<T: DeserializeOwned>(
    bytes: &[u8],
    supported_schema: u32,
) -> Result<(u32, T), SerializationError> {
    let envelope: SnapshotEnvelope = from_cbor(bytes)?;

    if envelope.schema_version > supported_schema {
        return Err(SerializationError::UnsupportedSchema {
            found: envelope.schema_version,
            supported: supported_schema,
        });
    }

    let actual = checksum(&envelope.payload);
    if actual != envelope.checksum {
        return Err(SerializationError::ChecksumMismatch {
            expected: envelope.checksum,
            actual,
        });
    }

    let value = from_cbor(&envelope.payload)?;
    Ok((envelope.schema_version, value))
}
