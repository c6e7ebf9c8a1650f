//! runstate core - versioned per-dataset job state and job locks
//!
//! This crate provides:
//! - The `VersionedBlobStore` contract and the naming rules for versions and
//!   aliases
//! - `DatasetStateStore`, the alias indirection layer answering "latest state
//!   of dataset X under job Y"
//! - The `JobLock` contract and an RAII guard
//! - In-memory backends for both contracts
//! - Error and logging facilities shared by the backend crate

pub mod codec;
pub mod dataset_state;
pub mod errors;
pub mod logging_facility;
pub mod memory;
pub mod model;
pub mod naming;
pub mod ports;

// Re-export commonly used types
pub use codec::{JsonCodec, StateCodec};
pub use dataset_state::DatasetStateStore;
pub use errors::{Result, RsError, RsErrorKind, RunStateError};
pub use model::{LockOwner, StateRecord};
pub use ports::{JobLock, JobLockGuard, LockHandle, StoredEntry, VersionedBlobStore};
