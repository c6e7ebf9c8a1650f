// Dataset state scenarios run against each disk-backed store

mod common;

use common::*;
use runstate_core::DatasetStateStore;
use runstate_store::GzipBlobStore;

#[test]
fn test_fs_persist_then_latest() {
    let (store, _dir) = fs_store();
    check_persist_then_latest(&DatasetStateStore::new(store));
}

#[test]
fn test_sqlite_persist_then_latest() {
    let (store, _dir) = sqlite_store();
    check_persist_then_latest(&DatasetStateStore::new(store));
}

#[test]
fn test_fs_history_preserved() {
    let (store, _dir) = fs_store();
    check_history_preserved(&DatasetStateStore::new(store));
}

#[test]
fn test_sqlite_history_preserved() {
    let (store, _dir) = sqlite_store();
    check_history_preserved(&DatasetStateStore::new(store));
}

#[test]
fn test_fs_legacy_filter() {
    let (store, _dir) = fs_store();
    check_legacy_filter(&DatasetStateStore::new(store));
}

#[test]
fn test_sqlite_legacy_filter() {
    let (store, _dir) = sqlite_store();
    check_legacy_filter(&DatasetStateStore::new(store));
}

#[test]
fn test_fs_slash_urns_round_trip() {
    let (store, _dir) = fs_store();
    check_slash_urns_round_trip(&DatasetStateStore::new(store));
}

#[test]
fn test_sqlite_slash_urns_round_trip() {
    let (store, _dir) = sqlite_store();
    check_slash_urns_round_trip(&DatasetStateStore::new(store));
}

#[test]
fn test_compressed_fs_persist_then_latest() {
    let (store, _dir) = fs_store();
    check_persist_then_latest(&DatasetStateStore::new(GzipBlobStore::new(store)));
}

#[test]
fn test_compressed_sqlite_legacy_filter() {
    let (store, _dir) = sqlite_store();
    check_legacy_filter(&DatasetStateStore::new(GzipBlobStore::new(store)));
}

#[test]
fn test_compressed_sqlite_slash_urns_round_trip() {
    let (store, _dir) = sqlite_store();
    check_slash_urns_round_trip(&DatasetStateStore::new(GzipBlobStore::new(store)));
}

#[test]
fn test_fs_slash_urn_files_stay_in_job_dir() {
    // Given: a state persisted for an HDFS-path URN
    let (store, dir) = fs_store();
    let states = DatasetStateStore::new(store);
    states
        .persist_dataset_state(
            "/data/tracking/PageViewEvent",
            &record("ingest1", "job_001", "/data/tracking/PageViewEvent", b"p"),
        )
        .unwrap();

    // Then: the version is one encoded file inside the job directory
    let job_dir = dir.path().join("state").join("ingest1");
    assert!(job_dir
        .join("%2Fdata%2Ftracking%2FPageViewEvent-job_001.dstate")
        .is_file());
    assert!(!dir.path().join("data").exists());
}

#[test]
fn test_fs_sanitized_file_names_on_disk() {
    // Given: a state persisted for a URN containing colons
    let (store, dir) = fs_store();
    let states = DatasetStateStore::new(store);
    states
        .persist_dataset_state(
            "urn:li:dataset:A",
            &record("ingest1", "job_001", "urn:li:dataset:A", b"p"),
        )
        .unwrap();

    // Then: the version file and alias pointer use the sanitized names
    let job_dir = dir.path().join("state").join("ingest1");
    assert!(job_dir.join("urn.li.dataset.A-job_001.dstate").is_file());
    assert_eq!(
        std::fs::read_to_string(job_dir.join(".aliases").join("urn.li.dataset.A-current.dstate"))
            .unwrap(),
        "urn.li.dataset.A-job_001.dstate"
    );
}

#[test]
fn test_sqlite_states_visible_across_handles() {
    // Given: two state stores on one database file
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.db");
    let writer = DatasetStateStore::new(runstate_store::SqliteBlobStore::open(&path).unwrap());
    let reader = DatasetStateStore::new(runstate_store::SqliteBlobStore::open(&path).unwrap());

    // When: one persists
    let state = record("ingest1", "job_001", "urn:a", b"shared");
    writer.persist_dataset_state("urn:a", &state).unwrap();

    // Then: the other reads it as latest
    assert_eq!(
        reader.get_latest_dataset_state("ingest1", "urn:a").unwrap(),
        state
    );
}
