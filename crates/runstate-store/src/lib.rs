//! runstate store - filesystem and SQLite backends
//!
//! Provides:
//! - `FsBlobStore` / `FsJobLock`: plain files and marker directories
//! - `SqliteBlobStore` / `SqliteJobLock`: tables in a shared database, with
//!   an embedded migrations framework
//! - `GzipBlobStore`: optional compression of stored values over any backend
//! - TOML configuration and a factory building backends from it

pub mod compression;
pub mod config;
pub mod db;
pub mod errors;
pub mod factory;
pub mod fs;
pub mod migrations;
pub mod sqlite;

// Re-export key types
pub use compression::GzipBlobStore;
pub use config::{JobLockConfig, RunStateConfig, StateStoreConfig};
pub use errors::Result;
pub use factory::{open_job_lock, open_state_store};
pub use fs::{FsBlobStore, FsJobLock};
pub use sqlite::{SqliteBlobStore, SqliteJobLock};
