use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// LockOwner - attributable identity of a job lock holder
///
/// Written into the lock marker on acquire so a contending caller can report
/// who holds the lock, and so release can refuse to remove a marker it does
/// not own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOwner {
    /// Unique per acquisition (UUID v7)
    pub owner_id: String,

    /// Process that acquired the lock
    pub pid: u32,

    /// Acquisition timestamp
    pub acquired_at: DateTime<Utc>,
}

impl LockOwner {
    /// Create an owner identity for the current process
    pub fn current_process() -> Self {
        Self {
            owner_id: Uuid::now_v7().to_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// How long the lock has been held as of `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.acquired_at)
    }

    /// Check if the marker is older than `stale_after`
    pub fn is_stale(&self, stale_after: std::time::Duration, now: DateTime<Utc>) -> bool {
        match Duration::from_std(stale_after) {
            Ok(limit) => self.age(now) > limit,
            Err(_) => false,
        }
    }

    /// Short human-readable attribution used in `AlreadyLocked` errors
    pub fn describe(&self) -> String {
        format!(
            "{} (pid {}, since {})",
            self.owner_id,
            self.pid,
            self.acquired_at.to_rfc3339()
        )
    }
}
