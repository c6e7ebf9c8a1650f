//! Filesystem-backed job lock
//!
//! A lock is a marker directory `{lock_dir}/{job}.lock/` created with
//! `create_dir`, which fails if the directory exists, so acquisition is a
//! single atomic create-if-absent on any local or shared filesystem. The
//! holder's identity is written inside as `owner-{acquired_at_millis}.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use runstate_core::errors::RunStateError;
use runstate_core::model::LockOwner;
use runstate_core::naming::sanitize_path_segment;
use runstate_core::ports::{JobLock, LockHandle};

use crate::errors::{io_read, io_write, Result};
use crate::fs::atomic::atomic_write;

const LOCK_NAMESPACE: &str = "job_locks";

/// Filesystem-backed job lock
#[derive(Debug, Clone)]
pub struct FsJobLock {
    lock_dir: PathBuf,
    stale_after: Option<Duration>,
}

impl FsJobLock {
    /// Create a lock rooted at `lock_dir` with no stale reclaim
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            stale_after: None,
        }
    }

    /// Reclaim markers older than `stale_after` on acquire
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }

    /// Marker directory for `job_name`
    pub fn marker_path(&self, job_name: &str) -> PathBuf {
        self.lock_dir
            .join(format!("{}.lock", sanitize_path_segment(job_name)))
    }

    fn try_create_marker(&self, job_name: &str, marker: &Path) -> Result<Option<LockHandle>> {
        match fs::create_dir(marker) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(io_write(LOCK_NAMESPACE, job_name, e)),
        }

        let owner = LockOwner::current_process();
        let owner_file = marker.join(format!(
            "owner-{}.json",
            owner.acquired_at.timestamp_millis()
        ));
        let written = serde_json::to_vec(&owner)
            .map_err(RunStateError::from)
            .and_then(|bytes| {
                atomic_write(&owner_file, &bytes).map_err(|e| io_write(LOCK_NAMESPACE, job_name, e))
            });
        if let Err(e) = written {
            // Leave no ownerless marker behind
            fs::remove_dir_all(marker).ok();
            return Err(e);
        }

        Ok(Some(LockHandle {
            job_name: job_name.to_string(),
            owner,
            resource: marker.display().to_string(),
        }))
    }

    /// Owner recorded in `marker`, if the marker exists and its owner file is
    /// readable
    fn read_owner(&self, job_name: &str, marker: &Path) -> Result<Option<LockOwner>> {
        let entries = match fs::read_dir(marker) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_read(LOCK_NAMESPACE, job_name, e)),
        };

        let mut owner_files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("owner-") && n.ends_with(".json"))
            })
            .collect();
        owner_files.sort();

        let Some(owner_file) = owner_files.first() else {
            return Ok(None);
        };
        let bytes = match fs::read(owner_file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_read(LOCK_NAMESPACE, job_name, e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(owner) => Ok(Some(owner)),
            Err(e) => {
                tracing::warn!(job_name, path = %owner_file.display(), error = %e, "Unreadable lock owner file");
                Ok(None)
            }
        }
    }
}

impl JobLock for FsJobLock {
    fn acquire(&self, job_name: &str) -> Result<LockHandle> {
        if job_name.is_empty() {
            return Err(RunStateError::invalid_input("job_name must not be empty"));
        }
        fs::create_dir_all(&self.lock_dir).map_err(|e| io_write(LOCK_NAMESPACE, job_name, e))?;

        let marker = self.marker_path(job_name);
        if let Some(handle) = self.try_create_marker(job_name, &marker)? {
            tracing::info!(job_name, owner_id = %handle.owner.owner_id, "Acquired job lock");
            return Ok(handle);
        }

        let existing = self.read_owner(job_name, &marker)?;
        let reclaim = match (&existing, self.stale_after) {
            (Some(owner), Some(limit)) => owner.is_stale(limit, Utc::now()),
            _ => false,
        };
        if reclaim {
            if let Some(owner) = &existing {
                tracing::warn!(
                    job_name,
                    stale_owner = %owner.owner_id,
                    stale_pid = owner.pid,
                    "Reclaiming stale job lock"
                );
            }
            match fs::remove_dir_all(&marker) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_write(LOCK_NAMESPACE, job_name, e)),
            }
            if let Some(handle) = self.try_create_marker(job_name, &marker)? {
                return Ok(handle);
            }
        }

        Err(RunStateError::AlreadyLocked {
            job_name: job_name.to_string(),
            owner: existing.map(|o| o.describe()),
        })
    }

    fn release(&self, handle: &LockHandle) -> Result<()> {
        let marker = self.marker_path(&handle.job_name);
        match self.read_owner(&handle.job_name, &marker)? {
            Some(owner) if owner.owner_id == handle.owner.owner_id => {
                fs::remove_dir_all(&marker)
                    .map_err(|e| io_write(LOCK_NAMESPACE, &handle.job_name, e))?;
                tracing::info!(job_name = %handle.job_name, owner_id = %owner.owner_id, "Released job lock");
                Ok(())
            }
            _ => Err(RunStateError::LockNotHeld {
                job_name: handle.job_name.clone(),
            }),
        }
    }

    fn is_locked(&self, job_name: &str) -> Result<bool> {
        match fs::metadata(self.marker_path(job_name)) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_read(LOCK_NAMESPACE, job_name, e)),
        }
    }

    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>> {
        self.read_owner(job_name, &self.marker_path(job_name))
    }

    fn force_release(&self, job_name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.marker_path(job_name)) {
            Ok(()) => {
                tracing::warn!(job_name, "Force-released job lock");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_write(LOCK_NAMESPACE, job_name, e)),
        }
    }
}
