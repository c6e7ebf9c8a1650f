use chrono::{TimeZone, Utc};
use runstate_core::StateRecord;

/// Build a state record with a fixed timestamp for deterministic comparisons
#[allow(dead_code)]
pub fn test_record(job_name: &str, job_id: &str, dataset_urn: &str, payload: &[u8]) -> StateRecord {
    StateRecord::new(job_name, job_id, dataset_urn, payload.to_vec())
        .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}
