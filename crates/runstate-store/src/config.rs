//! Backend configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [state_store]
//! backend = "sqlite"
//! db_path = "/var/lib/runstate/state.db"
//! table = "gobblin_job_state"     # optional, default "state_entries"
//! compressed_values = true        # optional, default false
//!
//! [job_lock]
//! backend = "sqlite"
//! db_path = "/var/lib/runstate/state.db"
//! stale_after_secs = 86400
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{config_error, Result};
use crate::sqlite::{validate_table_name, DEFAULT_TABLE};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStateConfig {
    /// Backend for dataset states
    pub state_store: StateStoreConfig,
    /// Backend for job locks
    pub job_lock: JobLockConfig,
}

/// Dataset state backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StateStoreConfig {
    /// One directory per job under `root_dir`
    Fs {
        root_dir: PathBuf,
        #[serde(default)]
        compressed_values: bool,
    },
    /// `table` in the database at `db_path`
    Sqlite {
        db_path: PathBuf,
        #[serde(default = "default_table")]
        table: String,
        #[serde(default)]
        compressed_values: bool,
    },
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl StateStoreConfig {
    /// Whether payloads are stored gzip-compressed
    pub fn compressed_values(&self) -> bool {
        match self {
            StateStoreConfig::Fs {
                compressed_values, ..
            }
            | StateStoreConfig::Sqlite {
                compressed_values, ..
            } => *compressed_values,
        }
    }
}

/// Job lock backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum JobLockConfig {
    /// Marker directories under `lock_dir`
    Fs {
        lock_dir: PathBuf,
        #[serde(default)]
        stale_after_secs: Option<u64>,
    },
    /// `job_locks` table in the database at `db_path`
    Sqlite {
        db_path: PathBuf,
        #[serde(default)]
        stale_after_secs: Option<u64>,
    },
}

impl JobLockConfig {
    /// Age after which an existing lock is reclaimed; `None` never reclaims
    pub fn stale_after(&self) -> Option<Duration> {
        match self {
            JobLockConfig::Fs {
                stale_after_secs, ..
            }
            | JobLockConfig::Sqlite {
                stale_after_secs, ..
            } => stale_after_secs.map(Duration::from_secs),
        }
    }
}

impl RunStateConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Config` if the document does not parse or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunStateConfig =
            toml::from_str(content).map_err(|e| config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("Cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded runstate configuration");
        Ok(config)
    }

    /// Check paths are set, the table name is usable and the stale-after age
    /// is positive
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let state_path = match &self.state_store {
            StateStoreConfig::Fs { root_dir, .. } => ("state_store.root_dir", root_dir),
            StateStoreConfig::Sqlite { db_path, .. } => ("state_store.db_path", db_path),
        };
        let lock_path = match &self.job_lock {
            JobLockConfig::Fs { lock_dir, .. } => ("job_lock.lock_dir", lock_dir),
            JobLockConfig::Sqlite { db_path, .. } => ("job_lock.db_path", db_path),
        };
        for (key, path) in [state_path, lock_path] {
            if path.as_os_str().is_empty() {
                return Err(config_error(format!("{} must not be empty", key)));
            }
        }
        if let StateStoreConfig::Sqlite { table, .. } = &self.state_store {
            validate_table_name(table)
                .map_err(|e| config_error(format!("state_store.table: {}", e)))?;
        }
        if self.job_lock.stale_after() == Some(Duration::ZERO) {
            return Err(config_error("job_lock.stale_after_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runstate_core::errors::RsErrorKind;

    #[test]
    fn test_parse_fs_and_sqlite() {
        let config = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "fs"
            root_dir = "/tmp/state"

            [job_lock]
            backend = "sqlite"
            db_path = "/tmp/locks.db"
            stale_after_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(
            config.state_store,
            StateStoreConfig::Fs {
                root_dir: PathBuf::from("/tmp/state"),
                compressed_values: false,
            }
        );
        assert_eq!(config.job_lock.stale_after(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_stale_after_defaults_to_never() {
        let config = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "sqlite"
            db_path = "state.db"

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            "#,
        )
        .unwrap();
        assert_eq!(config.job_lock.stale_after(), None);
    }

    #[test]
    fn test_sqlite_table_and_compression_options() {
        let config = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "sqlite"
            db_path = "state.db"
            table = "gobblin_job_state"
            compressed_values = true

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            "#,
        )
        .unwrap();

        assert!(config.state_store.compressed_values());
        assert_eq!(
            config.state_store,
            StateStoreConfig::Sqlite {
                db_path: PathBuf::from("state.db"),
                table: "gobblin_job_state".to_string(),
                compressed_values: true,
            }
        );
    }

    #[test]
    fn test_sqlite_table_defaults_to_state_entries() {
        let config = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "sqlite"
            db_path = "state.db"

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            "#,
        )
        .unwrap();

        assert!(!config.state_store.compressed_values());
        assert!(matches!(
            config.state_store,
            StateStoreConfig::Sqlite { ref table, .. } if table == "state_entries"
        ));
    }

    #[test]
    fn test_bad_table_name_rejected() {
        let err = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "sqlite"
            db_path = "state.db"
            table = "state; DROP TABLE job_locks"

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), RsErrorKind::Config);
        assert!(err.to_string().contains("state_store.table"));
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "redis"

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), RsErrorKind::Config);
    }

    #[test]
    fn test_zero_stale_after_rejected() {
        let err = RunStateConfig::from_toml_str(
            r#"
            [state_store]
            backend = "fs"
            root_dir = "state"

            [job_lock]
            backend = "fs"
            lock_dir = "locks"
            stale_after_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("stale_after_secs"));
    }
}
