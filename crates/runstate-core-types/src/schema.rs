//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_JOB_NAME: &str = "job_name";
pub const FIELD_JOB_ID: &str = "job_id";
pub const FIELD_DATASET_URN: &str = "dataset_urn";
pub const FIELD_NAMESPACE: &str = "namespace";
pub const FIELD_VERSION_NAME: &str = "version_name";
pub const FIELD_ALIAS_NAME: &str = "alias_name";
pub const FIELD_OWNER_ID: &str = "owner_id";

// Collection sizes
pub const FIELD_ENTRY_COUNT: &str = "entry_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
