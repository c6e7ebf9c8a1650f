//! In-memory backends for the store and lock contracts

mod blob_store;
mod job_lock;

pub use blob_store::MemoryBlobStore;
pub use job_lock::MemoryJobLock;
