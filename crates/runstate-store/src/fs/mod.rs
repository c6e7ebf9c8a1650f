//! Filesystem backends
//!
//! - [`FsBlobStore`]: one directory per namespace, one file per version,
//!   alias pointer files under `.aliases/`
//! - [`FsJobLock`]: one marker directory per job name

pub mod atomic;
mod blob_store;
mod job_lock;
mod segment;

pub use blob_store::FsBlobStore;
pub use job_lock::FsJobLock;
