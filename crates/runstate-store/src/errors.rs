//! Error helpers for runstate-store
//!
//! Maps medium errors (`std::io`, `rusqlite`, `toml`) onto core's
//! `RunStateError` with the namespace and entry they happened on.

use std::io;

use runstate_core::errors::RunStateError;

/// Result type alias using RunStateError
pub type Result<T> = runstate_core::errors::Result<T>;

/// Map a failed filesystem write
pub fn io_write(namespace: &str, name: &str, err: io::Error) -> RunStateError {
    RunStateError::store_write(namespace, name, err)
}

/// Map a failed filesystem read
pub fn io_read(namespace: &str, name: &str, err: io::Error) -> RunStateError {
    RunStateError::store_read(namespace, name, err)
}

/// Map a failed SQLite write
pub fn sqlite_write(namespace: &str, name: &str, err: rusqlite::Error) -> RunStateError {
    RunStateError::store_write(namespace, name, err)
}

/// Map a failed SQLite read
pub fn sqlite_read(namespace: &str, name: &str, err: rusqlite::Error) -> RunStateError {
    RunStateError::store_read(namespace, name, err)
}

/// Map a failure to open or configure a database
pub fn from_rusqlite(err: rusqlite::Error) -> RunStateError {
    RunStateError::store_write("sqlite", "connection", err)
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> RunStateError {
    RunStateError::store_write(
        "schema_version",
        migration_id,
        format!("Migration {} failed: {}", migration_id, reason),
    )
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> RunStateError {
    RunStateError::internal(format!(
        "Checksum mismatch for migration {}: expected {}, got {}",
        migration_id, expected, actual
    ))
}

/// Create a configuration error
pub fn config_error(message: impl Into<String>) -> RunStateError {
    RunStateError::Config {
        message: message.into(),
    }
}
