use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Result, RunStateError};
use crate::naming::{glob_match, validate_name};
use crate::ports::{StoredEntry, VersionedBlobStore};

#[derive(Debug, Clone)]
enum Entry {
    Version(Vec<u8>),
    Alias(String),
}

type Namespaces = HashMap<String, BTreeMap<String, Entry>>;

/// In-memory versioned blob store
///
/// A map of namespace to sorted entries behind a `RwLock`. State lives only as
/// long as the value; useful for tests and for embedding the state layer in a
/// single process.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryBlobStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Namespaces>> {
        self.namespaces
            .read()
            .map_err(|_| RunStateError::internal("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Namespaces>> {
        self.namespaces
            .write()
            .map_err(|_| RunStateError::internal("memory store lock poisoned"))
    }
}

impl VersionedBlobStore for MemoryBlobStore {
    fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()> {
        validate_name(namespace)?;
        validate_name(name)?;

        let mut namespaces = self.write()?;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        if let Some(Entry::Alias(_)) = entries.get(name) {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is an alias in namespace '{}'",
                name, namespace
            )));
        }
        entries.insert(name.to_string(), Entry::Version(payload.to_vec()));
        Ok(())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        validate_name(namespace)?;
        validate_name(name)?;

        let namespaces = self.read()?;
        let entries = namespaces
            .get(namespace)
            .ok_or_else(|| RunStateError::not_found(namespace, name))?;

        match entries.get(name) {
            Some(Entry::Version(payload)) => Ok(payload.clone()),
            Some(Entry::Alias(target)) => match entries.get(target) {
                Some(Entry::Version(payload)) => Ok(payload.clone()),
                _ => Err(RunStateError::not_found(namespace, target)),
            },
            None => Err(RunStateError::not_found(namespace, name)),
        }
    }

    fn get_all(
        &self,
        namespace: &str,
        pattern: &str,
        resolve_aliases: bool,
    ) -> Result<Vec<StoredEntry>> {
        validate_name(namespace)?;

        let namespaces = self.read()?;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (name, entry) in entries.iter().filter(|(n, _)| glob_match(pattern, n)) {
            match entry {
                Entry::Version(payload) => out.push(StoredEntry {
                    name: name.clone(),
                    alias_target: None,
                    payload: payload.clone(),
                }),
                Entry::Alias(target) if resolve_aliases => match entries.get(target) {
                    Some(Entry::Version(payload)) => out.push(StoredEntry {
                        name: name.clone(),
                        alias_target: Some(target.clone()),
                        payload: payload.clone(),
                    }),
                    _ => {
                        tracing::warn!(namespace, alias = %name, target = %target, "Skipping dangling alias");
                    }
                },
                Entry::Alias(_) => {}
            }
        }
        Ok(out)
    }

    fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        let namespaces = self.read()?;
        Ok(namespaces
            .get(namespace)
            .is_some_and(|entries| entries.contains_key(name)))
    }

    fn create_alias(&self, namespace: &str, existing_name: &str, alias_name: &str) -> Result<()> {
        validate_name(namespace)?;
        validate_name(existing_name)?;
        validate_name(alias_name)?;

        let mut namespaces = self.write()?;
        let entries = namespaces
            .get_mut(namespace)
            .ok_or_else(|| RunStateError::not_found(namespace, existing_name))?;

        if !matches!(entries.get(existing_name), Some(Entry::Version(_))) {
            return Err(RunStateError::not_found(namespace, existing_name));
        }
        if let Some(Entry::Version(_)) = entries.get(alias_name) {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is a version entry in namespace '{}'",
                alias_name, namespace
            )));
        }
        entries.insert(
            alias_name.to_string(),
            Entry::Alias(existing_name.to_string()),
        );
        Ok(())
    }

    fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
        validate_name(namespace)?;
        validate_name(alias_name)?;

        let namespaces = self.read()?;
        Ok(
            match namespaces.get(namespace).and_then(|e| e.get(alias_name)) {
                Some(Entry::Alias(target)) => Some(target.clone()),
                _ => None,
            },
        )
    }

    fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>> {
        validate_name(namespace)?;

        let namespaces = self.read()?;
        Ok(namespaces
            .get(namespace)
            .map(|entries| {
                entries
                    .keys()
                    .filter(|n| glob_match(pattern, n))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        let mut namespaces = self.write()?;
        Ok(namespaces
            .get_mut(namespace)
            .is_some_and(|entries| entries.remove(name).is_some()))
    }

    fn delete_namespace(&self, namespace: &str) -> Result<()> {
        validate_name(namespace)?;

        self.write()?.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryBlobStore::new();
        store.put("ingest1", "a.dstate", b"one").unwrap();
        assert_eq!(store.get("ingest1", "a.dstate").unwrap(), b"one");
    }

    #[test]
    fn test_alias_follows_target_overwrite() {
        let store = MemoryBlobStore::new();
        store.put("ingest1", "a.dstate", b"one").unwrap();
        store
            .create_alias("ingest1", "a.dstate", "current.dstate")
            .unwrap();
        store.put("ingest1", "a.dstate", b"two").unwrap();
        assert_eq!(store.get("ingest1", "current.dstate").unwrap(), b"two");
    }

    #[test]
    fn test_get_all_skips_aliases_without_resolution() {
        let store = MemoryBlobStore::new();
        store.put("ingest1", "a.dstate", b"one").unwrap();
        store
            .create_alias("ingest1", "a.dstate", "current.dstate")
            .unwrap();

        let unresolved = store.get_all("ingest1", "*", false).unwrap();
        assert_eq!(unresolved.len(), 1);
        assert!(!unresolved[0].is_alias());

        let resolved = store.get_all("ingest1", "*", true).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_slash_names_are_plain_keys() {
        let store = MemoryBlobStore::new();
        let version = "/data/tracking/PageViewEvent-job_001.dstate";
        let alias = "/data/tracking/PageViewEvent-current.dstate";
        store.put("ingest1", version, b"one").unwrap();
        store.create_alias("ingest1", version, alias).unwrap();

        assert_eq!(store.get("ingest1", alias).unwrap(), b"one");
        assert_eq!(
            store.list_names("ingest1", "*-current.dstate").unwrap(),
            vec![alias.to_string()]
        );
    }

    #[test]
    fn test_empty_names_rejected_on_every_call() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.get("ingest1", ""),
            Err(RunStateError::InvalidName { .. })
        ));
        assert!(matches!(
            store.exists("", "a.dstate"),
            Err(RunStateError::InvalidName { .. })
        ));
        assert!(matches!(
            store.delete_namespace(""),
            Err(RunStateError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_delete_namespace() {
        let store = MemoryBlobStore::new();
        store.put("ingest1", "a.dstate", b"one").unwrap();
        store.delete_namespace("ingest1").unwrap();
        assert!(!store.exists("ingest1", "a.dstate").unwrap());
    }
}
