//! Job lock contract
//!
//! A job lock is a non-blocking, per-job-name mutual exclusion marker kept in
//! a medium shared by every process that may run the job. State machine:
//!
//! ```text
//! Unlocked --acquire--> Locked(owner) --release(owner)--> Unlocked
//! ```
//!
//! A marker left behind by a crashed process keeps the job locked until an
//! operator calls `force_release` or a configured stale-after age elapses.

use std::sync::Arc;

use crate::errors::Result;
use crate::model::LockOwner;

/// Ownership of an acquired job lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Job the lock was acquired for (unsanitized)
    pub job_name: String,
    /// Identity written into the marker
    pub owner: LockOwner,
    /// Backing marker (path or table key)
    pub resource: String,
}

/// Per-job-name exclusive lock
pub trait JobLock: Send + Sync {
    /// Try to take the lock for `job_name` without waiting
    ///
    /// # Errors
    ///
    /// - `AlreadyLocked` (carrying the holder, when readable) if the marker
    ///   exists and is not reclaimable
    /// - `StoreWrite` on medium failure
    fn acquire(&self, job_name: &str) -> Result<LockHandle>;

    /// Remove the marker held by `handle`
    ///
    /// # Errors
    ///
    /// - `LockNotHeld` if the job is unlocked or locked by another owner
    /// - `StoreWrite` on medium failure
    fn release(&self, handle: &LockHandle) -> Result<()>;

    /// Check if a marker exists for `job_name`
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn is_locked(&self, job_name: &str) -> Result<bool>;

    /// Current holder of the lock, if any and readable
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>>;

    /// Remove the marker regardless of owner; returns whether one existed
    ///
    /// Operator recovery after a crashed run.
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` on medium failure.
    fn force_release(&self, job_name: &str) -> Result<bool>;
}

impl<T: JobLock + ?Sized> JobLock for Box<T> {
    fn acquire(&self, job_name: &str) -> Result<LockHandle> {
        (**self).acquire(job_name)
    }

    fn release(&self, handle: &LockHandle) -> Result<()> {
        (**self).release(handle)
    }

    fn is_locked(&self, job_name: &str) -> Result<bool> {
        (**self).is_locked(job_name)
    }

    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>> {
        (**self).current_owner(job_name)
    }

    fn force_release(&self, job_name: &str) -> Result<bool> {
        (**self).force_release(job_name)
    }
}

impl<T: JobLock + ?Sized> JobLock for Arc<T> {
    fn acquire(&self, job_name: &str) -> Result<LockHandle> {
        (**self).acquire(job_name)
    }

    fn release(&self, handle: &LockHandle) -> Result<()> {
        (**self).release(handle)
    }

    fn is_locked(&self, job_name: &str) -> Result<bool> {
        (**self).is_locked(job_name)
    }

    fn current_owner(&self, job_name: &str) -> Result<Option<LockOwner>> {
        (**self).current_owner(job_name)
    }

    fn force_release(&self, job_name: &str) -> Result<bool> {
        (**self).force_release(job_name)
    }
}

/// Held job lock released on drop
///
/// # Example
///
/// ```
/// use runstate_core::memory::MemoryJobLock;
/// use runstate_core::ports::JobLockGuard;
///
/// let locks = MemoryJobLock::new();
/// {
///     let _guard = JobLockGuard::acquire(&locks, "ingest1").unwrap();
///     assert!(JobLockGuard::acquire(&locks, "ingest1").is_err());
/// }
/// assert!(JobLockGuard::acquire(&locks, "ingest1").is_ok());
/// ```
#[derive(Debug)]
pub struct JobLockGuard<'a, L: JobLock + ?Sized> {
    lock: &'a L,
    handle: Option<LockHandle>,
}

impl<'a, L: JobLock + ?Sized> JobLockGuard<'a, L> {
    /// Acquire `job_name` on `lock`
    ///
    /// # Errors
    ///
    /// Propagates `AlreadyLocked` and medium failures from [`JobLock::acquire`].
    pub fn acquire(lock: &'a L, job_name: &str) -> Result<Self> {
        let handle = lock.acquire(job_name)?;
        Ok(Self {
            lock,
            handle: Some(handle),
        })
    }

    /// Handle of the held lock
    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    /// Release now and report the outcome
    ///
    /// # Errors
    ///
    /// Propagates errors from [`JobLock::release`].
    pub fn release(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => self.lock.release(&handle),
            None => Ok(()),
        }
    }
}

impl<L: JobLock + ?Sized> Drop for JobLockGuard<'_, L> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.lock.release(&handle) {
                tracing::warn!(
                    job_name = %handle.job_name,
                    owner_id = %handle.owner.owner_id,
                    error = %e,
                    "Failed to release job lock on drop"
                );
            }
        }
    }
}
