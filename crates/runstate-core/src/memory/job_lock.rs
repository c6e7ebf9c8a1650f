use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::errors::{Result, RunStateError};
use crate::model::LockOwner;
use crate::ports::{JobLock, LockHandle};

/// In-process job lock keyed by job name
///
/// Each value is an independent lock table, so several job instances in one
/// process do not interfere unless they share the value.
#[derive(Debug, Default)]
pub struct MemoryJobLock {
    held: Mutex<HashMap<String, LockOwner>>,
    stale_after: Option<Duration>,
}

impl MemoryJobLock {
    /// Create a new lock table with no stale reclaim
    pub fn new() -> Self {
        Self::default()
    }

    /// Reclaim markers older than `stale_after` on acquire
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }

    fn held(&self) -> Result<MutexGuard<'_, HashMap<String, LockOwner>>> {
        self.held
            .lock()
            .map_err(|_| RunStateError::internal("memory lock table poisoned"))
    }
}

impl JobLock for MemoryJobLock {
    fn acquire(&self, job_name: &str) -> Result<LockHandle> {
        let mut held = self.held()?;

        if let Some(existing) = held.get(job_name) {
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
                "Reclaiming stale job lock"
            );
        }

        let owner = LockOwner::current_process();
        held.insert(job_name.to_string(), owner.clone());
        Ok(LockHandle {
            job_name: job_name.to_string(),
            owner,
            resource: format!("memory:{}", job_name),
        })
    }

    fn release(&self, handle: &LockHandle) -> Result<()> {
        let mut held = self.held()?;
        match held.get(&handle.job_name) {
            Some(owner) if owner.owner_id == handle.owner.owner_id => {
                held.remove(&handle.job_name);
                Ok(())
            }
            _ => Err(RunStateError::LockNotHeld {
                job_name: handle.job_name.clone(),
            }),
        }
    }

    fn is_locked(&self, job_name: &str) -> Result<bool> {
        Ok(self.held()?.contains_key(job_name))
    }

    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>> {
        Ok(self.held()?.get(job_name).cloned())
    }

    fn force_release(&self, job_name: &str) -> Result<bool> {
        Ok(self.held()?.remove(job_name).is_some())
    }
}
