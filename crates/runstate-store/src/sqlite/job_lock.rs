//! SQLite-backed job lock
//!
//! One row per held lock in `job_locks`; the primary key on `job_name` makes
//! the insert the atomic create-if-absent. Acquire runs in an `IMMEDIATE`
//! transaction so the stale check and the insert see the same row.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use runstate_core::errors::RunStateError;
use runstate_core::model::LockOwner;
use runstate_core::ports::{JobLock, LockHandle};

use crate::db;
use crate::errors::{sqlite_read, sqlite_write, Result};

const LOCK_NAMESPACE: &str = "job_locks";

/// SQLite-backed job lock
pub struct SqliteJobLock {
    conn: Mutex<Connection>,
    stale_after: Option<Duration>,
}

impl SqliteJobLock {
    /// Open (creating and migrating if needed) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(db::open_migrated(path)?))
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` if the database cannot be created or migrated.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(db::open_in_memory_migrated()?))
    }

    /// Wrap an already-migrated connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            stale_after: None,
        }
    }

    /// Reclaim rows older than `stale_after` on acquire
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RunStateError::internal("sqlite connection mutex poisoned"))
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

fn fetch_owner(conn: &Connection, job_name: &str) -> Result<Option<LockOwner>> {
    let row: Option<(String, u32, i64)> = conn
        .query_row(
            "SELECT owner_id, pid, acquired_at FROM job_locks WHERE job_name = ?1",
            [job_name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| sqlite_read(LOCK_NAMESPACE, job_name, e))?;

    row.map(|(owner_id, pid, acquired_at_ms)| -> Result<LockOwner> {
        let acquired_at = Utc.timestamp_millis_opt(acquired_at_ms).single().ok_or_else(|| {
            RunStateError::internal(format!(
                "lock row for {} has invalid acquired_at {}",
                job_name, acquired_at_ms
            ))
        })?;
        Ok(LockOwner {
            owner_id,
            pid,
            acquired_at,
        })
    })
    .transpose()
}

impl JobLock for SqliteJobLock {
    fn acquire(&self, job_name: &str) -> Result<LockHandle> {
        if job_name.is_empty() {
            return Err(RunStateError::invalid_input("job_name must not be empty"));
        }

        let mut conn = self.conn()?;
        let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(e) if is_busy(&e) => {
                tracing::debug!(job_name, "Lock table busy, reporting contention");
                return Err(RunStateError::AlreadyLocked {
                    job_name: job_name.to_string(),
                    owner: None,
                });
            }
            Err(e) => return Err(sqlite_write(LOCK_NAMESPACE, job_name, e)),
        };

        if let Some(existing) = fetch_owner(&tx, job_name)? {
            let reclaim = self
                .stale_after
                .is_some_and(|limit| existing.is_stale(limit, Utc::now()));
            if !reclaim {
                return Err(RunStateError::AlreadyLocked {
                    job_name: job_name.to_string(),
                    owner: Some(existing.describe()),
                });
            }
            tracing::warn!(
                job_name,
                stale_owner = %existing.owner_id,
                stale_pid = existing.pid,
                "Reclaiming stale job lock"
            );
            tx.execute("DELETE FROM job_locks WHERE job_name = ?1", [job_name])
                .map_err(|e| sqlite_write(LOCK_NAMESPACE, job_name, e))?;
        }

        let owner = LockOwner::current_process();
        let inserted = tx.execute(
            "INSERT INTO job_locks (job_name, owner_id, pid, acquired_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                job_name,
                owner.owner_id,
                owner.pid,
                owner.acquired_at.timestamp_millis()
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(RunStateError::AlreadyLocked {
                    job_name: job_name.to_string(),
                    owner: None,
                });
            }
            Err(e) => return Err(sqlite_write(LOCK_NAMESPACE, job_name, e)),
        }
        tx.commit()
            .map_err(|e| sqlite_write(LOCK_NAMESPACE, job_name, e))?;

        tracing::info!(job_name, owner_id = %owner.owner_id, "Acquired job lock");
        Ok(LockHandle {
            job_name: job_name.to_string(),
            owner,
            resource: format!("job_locks:{}", job_name),
        })
    }

    fn release(&self, handle: &LockHandle) -> Result<()> {
        let removed = self
            .conn()?
            .execute(
                "DELETE FROM job_locks WHERE job_name = ?1 AND owner_id = ?2",
                params![handle.job_name, handle.owner.owner_id],
            )
            .map_err(|e| sqlite_write(LOCK_NAMESPACE, &handle.job_name, e))?;

        if removed == 0 {
            return Err(RunStateError::LockNotHeld {
                job_name: handle.job_name.clone(),
            });
        }
        tracing::info!(job_name = %handle.job_name, owner_id = %handle.owner.owner_id, "Released job lock");
        Ok(())
    }

    fn is_locked(&self, job_name: &str) -> Result<bool> {
        Ok(fetch_owner(&*self.conn()?, job_name)?.is_some())
    }

    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>> {
        fetch_owner(&*self.conn()?, job_name)
    }

    fn force_release(&self, job_name: &str) -> Result<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM job_locks WHERE job_name = ?1", [job_name])
            .map_err(|e| sqlite_write(LOCK_NAMESPACE, job_name, e))?;
        if removed > 0 {
            tracing::warn!(job_name, "Force-released job lock");
        }
        Ok(removed > 0)
    }
}
