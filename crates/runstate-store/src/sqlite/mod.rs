//! SQLite backends
//!
//! Both backends migrate their database on open and can share one file.

mod blob_store;
mod job_lock;

pub use blob_store::{validate_table_name, SqliteBlobStore, DEFAULT_TABLE};
pub use job_lock::SqliteJobLock;
