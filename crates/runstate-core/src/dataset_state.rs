//! Dataset state store
//!
//! Tracks the latest [`StateRecord`] of every dataset of a job on top of any
//! [`VersionedBlobStore`]. Each persist writes an immutable version and then
//! repoints the dataset's alias at it:
//!
//! 1. `put(job_name, version_name, record)`
//! 2. `create_alias(job_name, version_name, alias_name)`
//!
//! A crash between the two steps leaves the alias on the previous version.
//! Persisting again with the same job id rewrites the same version name, so
//! recovery is to re-run the persist.

use std::collections::HashMap;
use std::time::Instant;

use crate::codec::{JsonCodec, StateCodec};
use crate::errors::{Result, RunStateError};
use crate::model::StateRecord;
use crate::naming::{
    alias_name, version_name, CURRENT_MARKER, DATASET_ALIAS_PATTERN, LEGACY_ALIAS_NAME,
};
use crate::ports::{StoredEntry, VersionedBlobStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// Latest-state queries for per-dataset job state
///
/// Holds its backing store by value; pass `&S`, `Box<S>` or `Arc<S>` to share
/// one store between several layers.
pub struct DatasetStateStore<S, C = JsonCodec> {
    store: S,
    codec: C,
}

impl<S: VersionedBlobStore> DatasetStateStore<S> {
    /// Create a state store using the JSON codec
    pub fn new(store: S) -> Self {
        Self {
            store,
            codec: JsonCodec,
        }
    }
}

impl<S: VersionedBlobStore, C: StateCodec> DatasetStateStore<S, C> {
    /// Create a state store with a custom record codec
    pub fn with_codec(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Backing blob store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `state` as a new version of `dataset_urn` and make it current
    ///
    /// Returns the version name the record was stored under.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the job name or job id is empty, or the job id
    ///   would produce an alias name (`current`, `*-current`)
    /// - `Serialization` if the codec fails
    /// - `StoreWrite` / `NotFound` from the backing store; on failure in the
    ///   alias step the new version is stored but not current
    pub fn persist_dataset_state(&self, dataset_urn: &str, state: &StateRecord) -> Result<String> {
        let start = Instant::now();
        log_op_start!(
            "persist_dataset_state",
            job_name = %state.job_name,
            job_id = %state.job_id,
            dataset_urn = %dataset_urn
        );

        let result = self.persist_inner(dataset_urn, state);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(version) => {
                log_op_end!("persist_dataset_state", duration_ms = duration_ms, version_name = %version);
            }
            Err(e) => log_op_error!("persist_dataset_state", e.clone(), duration_ms = duration_ms),
        }
        result
    }

    fn persist_inner(&self, dataset_urn: &str, state: &StateRecord) -> Result<String> {
        validate_record_keys(state)?;

        let job_name = state.job_name.as_str();
        let version = version_name(dataset_urn, &state.job_id);
        let alias = alias_name(dataset_urn);
        let encoded = self.codec.encode(state)?;

        tracing::info!(job_name, version_name = %version, "Persisting dataset state");
        self.store.put(job_name, &version, &encoded)?;
        self.store.create_alias(job_name, &version, &alias)?;
        Ok(version)
    }

    /// Latest state of `dataset_urn` under `job_name`
    ///
    /// # Errors
    ///
    /// - `NotFound` if no state was ever persisted for the dataset
    /// - `StoreRead` / `Serialization` on medium or decode failure
    pub fn get_latest_dataset_state(&self, job_name: &str, dataset_urn: &str) -> Result<StateRecord> {
        let start = Instant::now();
        log_op_start!("get_latest_dataset_state", job_name = %job_name, dataset_urn = %dataset_urn);

        let result = self
            .store
            .get(job_name, &alias_name(dataset_urn))
            .and_then(|bytes| self.codec.decode(&bytes));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!("get_latest_dataset_state", duration_ms = duration_ms);
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(job_name, dataset_urn, "No previous dataset state");
                log_op_end!("get_latest_dataset_state", duration_ms = duration_ms, found = false);
            }
            Err(e) => log_op_error!("get_latest_dataset_state", e.clone(), duration_ms = duration_ms),
        }
        result
    }

    /// Latest state of every dataset of `job_name`, keyed by dataset URN
    ///
    /// Keys are each record's own `dataset_urn`, not the alias name. When the
    /// job has dataset-scoped aliases the legacy default-dataset entry is
    /// dropped; see [`drop_legacy_default_state`].
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` / `Serialization` on medium or decode failure.
    pub fn get_latest_dataset_states_by_urns(
        &self,
        job_name: &str,
    ) -> Result<HashMap<String, StateRecord>> {
        let start = Instant::now();
        log_op_start!("get_latest_dataset_states_by_urns", job_name = %job_name);

        let result = self.latest_states_inner(job_name);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(states) => {
                log_op_end!(
                    "get_latest_dataset_states_by_urns",
                    duration_ms = duration_ms,
                    entry_count = states.len()
                );
            }
            Err(e) => log_op_error!(
                "get_latest_dataset_states_by_urns",
                e.clone(),
                duration_ms = duration_ms
            ),
        }
        result
    }

    fn latest_states_inner(&self, job_name: &str) -> Result<HashMap<String, StateRecord>> {
        let mut aliases: Vec<StoredEntry> = self
            .store
            .get_all(job_name, DATASET_ALIAS_PATTERN, true)?
            .into_iter()
            .chain(self.store.get_all(job_name, LEGACY_ALIAS_NAME, true)?)
            .filter(StoredEntry::is_alias)
            .collect();
        aliases.sort_by(|a, b| a.name.cmp(&b.name));

        let mut states = HashMap::new();
        for entry in aliases {
            let record = self.codec.decode(&entry.payload)?;
            states.insert(record.dataset_urn.clone(), record);
        }

        Ok(drop_legacy_default_state(job_name, states))
    }

    /// Exact historical version of `dataset_urn` written by run `job_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if that run never persisted state for the dataset
    /// - `StoreRead` / `Serialization` on medium or decode failure
    pub fn get_dataset_state(
        &self,
        job_name: &str,
        dataset_urn: &str,
        job_id: &str,
    ) -> Result<StateRecord> {
        let bytes = self.store.get(job_name, &version_name(dataset_urn, job_id))?;
        self.codec.decode(&bytes)
    }

    /// Check if `dataset_urn` has a current state under `job_name`
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    pub fn dataset_state_exists(&self, job_name: &str, dataset_urn: &str) -> Result<bool> {
        self.store.exists(job_name, &alias_name(dataset_urn))
    }

    /// Remove every version and alias stored for `job_name`
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` on medium failure.
    pub fn delete_job_states(&self, job_name: &str) -> Result<()> {
        tracing::info!(job_name, "Deleting all dataset states for job");
        self.store.delete_namespace(job_name)
    }
}

fn validate_record_keys(state: &StateRecord) -> Result<()> {
    if state.job_name.is_empty() {
        return Err(RunStateError::invalid_input("job_name must not be empty"));
    }
    if state.job_id.is_empty() {
        return Err(RunStateError::invalid_input("job_id must not be empty"));
    }
    if state.job_id == CURRENT_MARKER || state.job_id.ends_with(&format!("-{}", CURRENT_MARKER)) {
        return Err(RunStateError::invalid_input(format!(
            "job_id '{}' collides with the alias naming scheme",
            state.job_id
        )));
    }
    Ok(())
}

/// Drop the legacy default-dataset state once dataset-scoped states exist
///
/// Jobs that predate per-dataset tracking kept a single `current.dstate`
/// alias for the default (empty) URN. That alias is never removed, so after
/// migration it lingers next to the dataset aliases. When more than one state
/// is present, the `""` entry is treated as stale residue and removed.
///
/// Known edge case: a job whose genuine dataset URN is `""` loses that entry
/// whenever other datasets are present.
pub fn drop_legacy_default_state(
    job_name: &str,
    mut states: HashMap<String, StateRecord>,
) -> HashMap<String, StateRecord> {
    if states.len() > 1 {
        if let Some(legacy) = states.remove("") {
            tracing::warn!(
                job_name,
                legacy_job_id = %legacy.job_id,
                dataset_count = states.len(),
                "Alias resolution ambiguity: ignoring legacy default-dataset state"
            );
        }
    }
    states
}
