//! Encode/decode step between `StateRecord` and the opaque bytes a
//! `VersionedBlobStore` holds.

use crate::errors::{Result, RunStateError};
use crate::model::StateRecord;

/// Pluggable record codec
pub trait StateCodec: Send + Sync {
    /// Encode a record into bytes for storage
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the record cannot be encoded.
    fn encode(&self, record: &StateRecord) -> Result<Vec<u8>>;

    /// Decode stored bytes back into a record
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the bytes are not a valid record.
    fn decode(&self, bytes: &[u8]) -> Result<StateRecord>;
}

/// JSON codec (payload carried as base64)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl StateCodec for JsonCodec {
    fn encode(&self, record: &StateRecord) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<StateRecord> {
        serde_json::from_slice(bytes).map_err(|e| RunStateError::Serialization {
            message: format!("Failed to decode state record: {}", e),
        })
    }
}
