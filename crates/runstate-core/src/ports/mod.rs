//! Contracts consumed by the state layer and the job-execution driver
//!
//! - [`VersionedBlobStore`]: namespace-scoped blob storage with aliases
//! - [`JobLock`]: per-job-name mutual exclusion

pub mod blob_store;
pub mod job_lock;

pub use blob_store::{StoredEntry, VersionedBlobStore};
pub use job_lock::{JobLock, JobLockGuard, LockHandle};
