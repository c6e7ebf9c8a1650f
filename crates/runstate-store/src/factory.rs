//! Backend construction from configuration

use std::sync::Arc;

use runstate_core::ports::{JobLock, VersionedBlobStore};
use runstate_core::DatasetStateStore;

use crate::compression::GzipBlobStore;
use crate::config::{JobLockConfig, RunStateConfig, StateStoreConfig};
use crate::errors::Result;
use crate::fs::{FsBlobStore, FsJobLock};
use crate::sqlite::{SqliteBlobStore, SqliteJobLock};

/// Shared state store backend
pub type DynBlobStore = Arc<dyn VersionedBlobStore>;

/// Shared job lock backend
pub type DynJobLock = Arc<dyn JobLock>;

/// Open the configured state store backend
///
/// With `compressed_values` the backend is wrapped in a [`GzipBlobStore`].
///
/// # Errors
///
/// Returns `StoreWrite` if a SQLite database cannot be opened or migrated,
/// and `InvalidInput` for an unusable table name.
pub fn open_state_store(config: &StateStoreConfig) -> Result<DynBlobStore> {
    let store: DynBlobStore = match config {
        StateStoreConfig::Fs { root_dir, .. } => Arc::new(FsBlobStore::new(root_dir)),
        StateStoreConfig::Sqlite { db_path, table, .. } => {
            Arc::new(SqliteBlobStore::open_with_table(db_path, table)?)
        }
    };
    let store: DynBlobStore = if config.compressed_values() {
        Arc::new(GzipBlobStore::new(store))
    } else {
        store
    };
    tracing::debug!(backend = ?config, "Opened state store");
    Ok(store)
}

/// Open the configured job lock backend
///
/// # Errors
///
/// Returns `StoreWrite` if a SQLite database cannot be opened or migrated.
pub fn open_job_lock(config: &JobLockConfig) -> Result<DynJobLock> {
    let stale_after = config.stale_after();
    let lock: DynJobLock = match config {
        JobLockConfig::Fs { lock_dir, .. } => {
            let lock = FsJobLock::new(lock_dir);
            Arc::new(match stale_after {
                Some(age) => lock.with_stale_after(age),
                None => lock,
            })
        }
        JobLockConfig::Sqlite { db_path, .. } => {
            let lock = SqliteJobLock::open(db_path)?;
            Arc::new(match stale_after {
                Some(age) => lock.with_stale_after(age),
                None => lock,
            })
        }
    };
    tracing::debug!(backend = ?config, "Opened job lock");
    Ok(lock)
}

/// Open both backends and wrap the state store in a [`DatasetStateStore`]
///
/// # Errors
///
/// Propagates errors from [`open_state_store`] and [`open_job_lock`].
pub fn open(config: &RunStateConfig) -> Result<(DatasetStateStore<DynBlobStore>, DynJobLock)> {
    let states = DatasetStateStore::new(open_state_store(&config.state_store)?);
    let locks = open_job_lock(&config.job_lock)?;
    Ok((states, locks))
}
