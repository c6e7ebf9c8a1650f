use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// StateRecord - a snapshot of one dataset's processing state for one job run
///
/// Records are immutable once persisted: every persist writes a new version
/// keyed by `job_id`. The payload is opaque to this crate; only the metadata
/// fields are inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Logical job name; doubles as the store namespace
    pub job_name: String,

    /// Identifier of the run that produced this state (unique per run)
    pub job_id: String,

    /// Dataset within a multi-dataset job; empty for the default dataset
    #[serde(default)]
    pub dataset_urn: String,

    /// Opaque serialized state
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,

    /// When the run produced this state
    pub timestamp: DateTime<Utc>,
}

impl StateRecord {
    /// Create a new record stamped with the current time
    ///
    /// # Arguments
    /// * `job_name` - Logical job name
    /// * `job_id` - Run identifier
    /// * `dataset_urn` - Dataset URN, or `""` for the default dataset
    /// * `payload` - Opaque state bytes
    pub fn new(
        job_name: impl Into<String>,
        job_id: impl Into<String>,
        dataset_urn: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            job_id: job_id.into(),
            dataset_urn: dataset_urn.into(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }

    /// Override the timestamp (deterministic tests, replayed runs)
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check if this record belongs to the default (legacy) dataset
    pub fn is_default_dataset(&self) -> bool {
        self.dataset_urn.is_empty()
    }
}

mod payload_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
