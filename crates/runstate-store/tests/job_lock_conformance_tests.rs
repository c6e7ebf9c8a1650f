// Integration tests for the JobLock contract on disk-backed locks

mod common;

use std::sync::Arc;
use std::thread;

use common::*;
use runstate_core::{JobLock, JobLockGuard};
use runstate_store::FsJobLock;

#[test]
fn test_fs_lock_exclusion() {
    let (locks, _dir) = fs_lock();
    check_lock_exclusion(&locks);
}

#[test]
fn test_sqlite_lock_exclusion() {
    let (locks, _dir) = sqlite_lock();
    check_lock_exclusion(&locks);
}

#[test]
fn test_fs_independent_jobs() {
    let (locks, _dir) = fs_lock();
    check_independent_jobs(&locks);
}

#[test]
fn test_sqlite_independent_jobs() {
    let (locks, _dir) = sqlite_lock();
    check_independent_jobs(&locks);
}

#[test]
fn test_fs_release_requires_ownership() {
    let (locks, _dir) = fs_lock();
    check_release_requires_ownership(&locks);
}

#[test]
fn test_sqlite_release_requires_ownership() {
    let (locks, _dir) = sqlite_lock();
    check_release_requires_ownership(&locks);
}

#[test]
fn test_fs_force_release() {
    let (locks, _dir) = fs_lock();
    check_force_release(&locks);
}

#[test]
fn test_sqlite_force_release() {
    let (locks, _dir) = sqlite_lock();
    check_force_release(&locks);
}

#[test]
fn test_fs_lock_shared_between_instances() {
    // Given: two lock instances over the same directory (two processes)
    let dir = tempfile::TempDir::new().unwrap();
    let a = FsJobLock::new(dir.path());
    let b = FsJobLock::new(dir.path());

    // When: one holds job1
    let guard = JobLockGuard::acquire(&a, "job1").unwrap();

    // Then: the other is refused until the guard drops
    assert!(b.acquire("job1").is_err());
    drop(guard);
    assert!(b.acquire("job1").is_ok());
}

#[test]
fn test_fs_concurrent_acquire_has_single_winner() {
    let dir = tempfile::TempDir::new().unwrap();
    let locks = Arc::new(FsJobLock::new(dir.path()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.acquire("job1").is_ok())
        })
        .collect();
    let winners = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
}
