//! Shared fixtures and backend-independent checks
//!
//! Each `check_*` function exercises one contract property against any
//! backend; the test files call it once per backend.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::TimeZone;
use runstate_core::naming::version_name;
use runstate_core::ports::{JobLock, VersionedBlobStore};
use runstate_core::{DatasetStateStore, RunStateError, StateRecord};
use runstate_store::{FsBlobStore, FsJobLock, SqliteBlobStore, SqliteJobLock};
use tempfile::TempDir;

pub fn fs_store() -> (FsBlobStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    (FsBlobStore::new(dir.path().join("state")), dir)
}

pub fn sqlite_store() -> (SqliteBlobStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteBlobStore::open(dir.path().join("state.db")).expect("Failed to open db");
    (store, dir)
}

pub fn fs_lock() -> (FsJobLock, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    (FsJobLock::new(dir.path().join("locks")), dir)
}

pub fn sqlite_lock() -> (SqliteJobLock, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let lock = SqliteJobLock::open(dir.path().join("locks.db")).expect("Failed to open db");
    (lock, dir)
}

pub fn record(job_name: &str, job_id: &str, dataset_urn: &str, payload: &[u8]) -> StateRecord {
    StateRecord::new(job_name, job_id, dataset_urn, payload.to_vec()).with_timestamp(
        chrono::Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

// ---------- VersionedBlobStore ----------

pub fn check_put_get_overwrite(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "a.dstate", b"one").unwrap();
    assert_eq!(store.get("ingest1", "a.dstate").unwrap(), b"one");

    store.put("ingest1", "a.dstate", b"two").unwrap();
    assert_eq!(store.get("ingest1", "a.dstate").unwrap(), b"two");
}

pub fn check_missing_entry_not_found(store: &dyn VersionedBlobStore) {
    let err = store.get("ingest1", "missing.dstate").unwrap_err();
    assert_eq!(err, RunStateError::not_found("ingest1", "missing.dstate"));
    assert!(!store.exists("ingest1", "missing.dstate").unwrap());
}

pub fn check_alias_resolves_one_level(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "v1.dstate", b"one").unwrap();
    store.put("ingest1", "v2.dstate", b"two").unwrap();

    store
        .create_alias("ingest1", "v1.dstate", "current.dstate")
        .unwrap();
    assert_eq!(store.get("ingest1", "current.dstate").unwrap(), b"one");

    // Repoint
    store
        .create_alias("ingest1", "v2.dstate", "current.dstate")
        .unwrap();
    assert_eq!(store.get("ingest1", "current.dstate").unwrap(), b"two");
    assert_eq!(
        store.resolve_alias("ingest1", "current.dstate").unwrap(),
        Some("v2.dstate".to_string())
    );
    assert_eq!(store.resolve_alias("ingest1", "v2.dstate").unwrap(), None);

    // Aliases may not target aliases
    let err = store
        .create_alias("ingest1", "current.dstate", "other.dstate")
        .unwrap_err();
    assert!(err.is_not_found());
}

pub fn check_alias_and_version_names_disjoint(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "v1.dstate", b"one").unwrap();
    store
        .create_alias("ingest1", "v1.dstate", "current.dstate")
        .unwrap();

    assert!(matches!(
        store.put("ingest1", "current.dstate", b"x"),
        Err(RunStateError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.create_alias("ingest1", "v1.dstate", "v1.dstate"),
        Err(RunStateError::InvalidInput { .. })
    ));
    assert_eq!(store.get("ingest1", "current.dstate").unwrap(), b"one");
}

pub fn check_alias_to_missing_target(store: &dyn VersionedBlobStore) {
    let err = store
        .create_alias("ingest1", "missing.dstate", "current.dstate")
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!store.exists("ingest1", "current.dstate").unwrap());
}

pub fn check_get_all_pattern_and_resolution(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "a-j1.dstate", b"a1").unwrap();
    store.put("ingest1", "b-j1.dstate", b"b1").unwrap();
    store
        .create_alias("ingest1", "a-j1.dstate", "a-current.dstate")
        .unwrap();
    store
        .create_alias("ingest1", "b-j1.dstate", "b-current.dstate")
        .unwrap();

    let resolved = store
        .get_all("ingest1", "*-current.dstate", true)
        .unwrap();
    let summary: Vec<(&str, Option<&str>, &[u8])> = resolved
        .iter()
        .map(|e| (e.name.as_str(), e.alias_target.as_deref(), e.payload.as_slice()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a-current.dstate", Some("a-j1.dstate"), &b"a1"[..]),
            ("b-current.dstate", Some("b-j1.dstate"), &b"b1"[..]),
        ]
    );

    assert!(store
        .get_all("ingest1", "*-current.dstate", false)
        .unwrap()
        .is_empty());

    let versions = store.get_all("ingest1", "*", false).unwrap();
    assert_eq!(versions.len(), 2);
    assert!(versions.iter().all(|e| !e.is_alias()));

    assert!(store.get_all("unknown", "*", true).unwrap().is_empty());
}

pub fn check_namespaces_isolated(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "a.dstate", b"one").unwrap();
    store.put("ingest2", "a.dstate", b"two").unwrap();

    assert_eq!(store.get("ingest1", "a.dstate").unwrap(), b"one");
    assert_eq!(store.get("ingest2", "a.dstate").unwrap(), b"two");

    store.delete_namespace("ingest1").unwrap();
    assert!(!store.exists("ingest1", "a.dstate").unwrap());
    assert!(store.exists("ingest2", "a.dstate").unwrap());

    // Deleting a missing namespace is a no-op
    store.delete_namespace("ingest1").unwrap();
}

pub fn check_delete_and_list(store: &dyn VersionedBlobStore) {
    store.put("ingest1", "a.dstate", b"one").unwrap();
    store.put("ingest1", "b.dstate", b"two").unwrap();
    store
        .create_alias("ingest1", "a.dstate", "current.dstate")
        .unwrap();

    assert_eq!(
        store.list_names("ingest1", "*.dstate").unwrap(),
        vec!["a.dstate", "b.dstate", "current.dstate"]
    );

    assert!(store.delete("ingest1", "b.dstate").unwrap());
    assert!(!store.delete("ingest1", "b.dstate").unwrap());
    assert!(store.delete("ingest1", "current.dstate").unwrap());
    assert_eq!(store.list_names("ingest1", "*").unwrap(), vec!["a.dstate"]);
}

// ---------- DatasetStateStore ----------

pub fn check_persist_then_latest<S: VersionedBlobStore>(states: &DatasetStateStore<S>) {
    // GIVEN state persisted for dataset A under job ingest1
    let state = record("ingest1", "job_001", "urn:li:dataset:A", b"watermark=10");
    let version = states
        .persist_dataset_state("urn:li:dataset:A", &state)
        .unwrap();

    // THEN the version and alias names follow the naming rules
    assert_eq!(version, "urn.li.dataset.A-job_001.dstate");
    assert_eq!(
        states
            .store()
            .resolve_alias("ingest1", "urn.li.dataset.A-current.dstate")
            .unwrap(),
        Some("urn.li.dataset.A-job_001.dstate".to_string())
    );

    // AND the latest state is the persisted record
    let latest = states
        .get_latest_dataset_state("ingest1", "urn:li:dataset:A")
        .unwrap();
    assert_eq!(latest, state);

    // AND dataset B has no state
    let err = states
        .get_latest_dataset_state("ingest1", "urn:li:dataset:B")
        .unwrap_err();
    assert!(err.is_not_found());
}

pub fn check_history_preserved<S: VersionedBlobStore>(states: &DatasetStateStore<S>) {
    let first = record("ingest1", "job_001", "urn:a", b"one");
    let second = record("ingest1", "job_002", "urn:a", b"two");
    states.persist_dataset_state("urn:a", &first).unwrap();
    states.persist_dataset_state("urn:a", &second).unwrap();

    assert_eq!(
        states.get_latest_dataset_state("ingest1", "urn:a").unwrap(),
        second
    );
    assert_eq!(
        states
            .get_dataset_state("ingest1", "urn:a", "job_001")
            .unwrap(),
        first
    );
}

pub fn check_legacy_filter<S: VersionedBlobStore>(states: &DatasetStateStore<S>) {
    // GIVEN only a legacy default-dataset state
    let legacy = record("ingest1", "job_001", "", b"legacy");
    states.persist_dataset_state("", &legacy).unwrap();

    let only_legacy = states.get_latest_dataset_states_by_urns("ingest1").unwrap();
    assert_eq!(only_legacy, HashMap::from([(String::new(), legacy)]));

    // WHEN dataset-scoped states are added
    let a = record("ingest1", "job_002", "urn:a", b"a");
    let b = record("ingest1", "job_002", "urn:b", b"b");
    states.persist_dataset_state("urn:a", &a).unwrap();
    states.persist_dataset_state("urn:b", &b).unwrap();

    // THEN the legacy entry is dropped and keys are the records' own URNs
    let by_urn = states.get_latest_dataset_states_by_urns("ingest1").unwrap();
    assert_eq!(
        by_urn,
        HashMap::from([("urn:a".to_string(), a), ("urn:b".to_string(), b)])
    );
}

pub fn check_slash_urns_round_trip<S: VersionedBlobStore>(states: &DatasetStateStore<S>) {
    let urns = [
        "/data/tracking/PageViewEvent",
        "urn:li:dataset:(urn:li:dataPlatform:hdfs,/data/tracking/PageViewEvent,PROD)",
    ];

    // GIVEN states persisted under a job name and URNs holding '/'
    for urn in urns {
        let state = record("team/ingest", "job_001", urn, b"offset=42");
        let version = states.persist_dataset_state(urn, &state).unwrap();
        assert_eq!(version, version_name(urn, "job_001"));

        // THEN each reads back as the latest state of its URN
        assert_eq!(
            states.get_latest_dataset_state("team/ingest", urn).unwrap(),
            state
        );
        assert_eq!(
            states
                .get_dataset_state("team/ingest", urn, "job_001")
                .unwrap(),
            state
        );
    }

    // AND the alias scan finds both under their own URNs
    let by_urn = states
        .get_latest_dataset_states_by_urns("team/ingest")
        .unwrap();
    let mut keys: Vec<&str> = by_urn.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, urns.to_vec());
}

// ---------- JobLock ----------

pub fn check_lock_exclusion(locks: &dyn JobLock) {
    let first = locks.acquire("job1").unwrap();
    assert!(locks.is_locked("job1").unwrap());

    match locks.acquire("job1") {
        Err(RunStateError::AlreadyLocked { job_name, owner }) => {
            assert_eq!(job_name, "job1");
            assert!(owner.is_some_and(|o| o.contains(&first.owner.owner_id)));
        }
        other => panic!("expected AlreadyLocked, got {:?}", other),
    }

    locks.release(&first).unwrap();
    assert!(!locks.is_locked("job1").unwrap());
    let second = locks.acquire("job1").unwrap();
    locks.release(&second).unwrap();
}

pub fn check_independent_jobs(locks: &dyn JobLock) {
    let one = locks.acquire("job1").unwrap();
    let two = locks.acquire("job2").unwrap();
    locks.release(&one).unwrap();
    assert!(locks.is_locked("job2").unwrap());
    locks.release(&two).unwrap();
}

pub fn check_release_requires_ownership(locks: &dyn JobLock) {
    let old = locks.acquire("job1").unwrap();
    locks.release(&old).unwrap();
    assert!(matches!(
        locks.release(&old),
        Err(RunStateError::LockNotHeld { .. })
    ));

    let current = locks.acquire("job1").unwrap();
    assert!(matches!(
        locks.release(&old),
        Err(RunStateError::LockNotHeld { .. })
    ));
    assert_eq!(
        locks.current_owner("job1").unwrap().map(|o| o.owner_id),
        Some(current.owner.owner_id.clone())
    );
    locks.release(&current).unwrap();
}

pub fn check_force_release(locks: &dyn JobLock) {
    let _crashed = locks.acquire("job1").unwrap();
    assert!(locks.acquire("job1").is_err());

    assert!(locks.force_release("job1").unwrap());
    assert!(!locks.force_release("job1").unwrap());
    assert!(locks.current_owner("job1").unwrap().is_none());
    assert!(locks.acquire("job1").is_ok());
}
