//! Versioned blob store contract
//!
//! A store holds opaque payloads under `(namespace, name)` keys plus alias
//! entries that point at another name in the same namespace. Aliases resolve
//! exactly one level: an alias may only target a version entry.

use std::sync::Arc;

use crate::errors::Result;

/// One entry returned by [`VersionedBlobStore::get_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Name that matched the pattern
    pub name: String,
    /// Target version name when `name` is an alias
    pub alias_target: Option<String>,
    /// Payload of the version entry (the alias target's, for aliases)
    pub payload: Vec<u8>,
}

impl StoredEntry {
    /// Check if this entry was reached through an alias
    pub fn is_alias(&self) -> bool {
        self.alias_target.is_some()
    }

    /// Name of the version entry the payload came from
    pub fn resolved_name(&self) -> &str {
        self.alias_target.as_deref().unwrap_or(&self.name)
    }
}

/// Namespace-scoped versioned blob storage with alias indirection
///
/// Implementations must be safe to share between threads. No operation
/// retries internally; medium failures surface as `StoreWrite` or
/// `StoreRead`.
pub trait VersionedBlobStore: Send + Sync {
    /// Write `payload` under `(namespace, name)`, overwriting any version
    /// entry of the same name.
    ///
    /// # Errors
    ///
    /// - `InvalidName` if the namespace or name is empty
    /// - `InvalidInput` if `name` is currently an alias
    /// - `StoreWrite` on medium failure
    fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()>;

    /// Read the payload under `(namespace, name)`, resolving one alias level
    ///
    /// # Errors
    ///
    /// - `NotFound` if neither a version nor an alias exists, or the alias
    ///   target is gone
    /// - `StoreRead` on medium failure
    fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>>;

    /// Every entry in `namespace` whose name matches `pattern`
    ///
    /// With `resolve_aliases`, matching aliases are returned with their
    /// target's payload; without it, aliases are skipped. Results are sorted
    /// by name. A missing namespace yields an empty vec.
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn get_all(
        &self,
        namespace: &str,
        pattern: &str,
        resolve_aliases: bool,
    ) -> Result<Vec<StoredEntry>>;

    /// Check if a version or alias exists under `(namespace, name)`
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Point `alias_name` at `existing_name`, replacing any previous target
    ///
    /// The swap is atomic: readers see either the old or the new target.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `existing_name` is not a version entry
    /// - `InvalidInput` if `alias_name` is a version entry
    /// - `StoreWrite` on medium failure
    fn create_alias(&self, namespace: &str, existing_name: &str, alias_name: &str) -> Result<()>;

    /// Current target of `alias_name`, if it is an alias
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>>;

    /// Names (versions and aliases) in `namespace` matching `pattern`, sorted
    ///
    /// # Errors
    ///
    /// Returns `StoreRead` on medium failure.
    fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>>;

    /// Remove a version or alias; returns whether anything was removed
    ///
    /// Removing a version does not touch aliases pointing at it.
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` on medium failure.
    fn delete(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Remove a namespace with all its versions and aliases
    ///
    /// # Errors
    ///
    /// Returns `StoreWrite` on medium failure.
    fn delete_namespace(&self, namespace: &str) -> Result<()>;
}

macro_rules! forward_blob_store {
    ($ty:ty) => {
        impl<T: VersionedBlobStore + ?Sized> VersionedBlobStore for $ty {
            fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()> {
                (**self).put(namespace, name, payload)
            }

            fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
                (**self).get(namespace, name)
            }

            fn get_all(
                &self,
                namespace: &str,
                pattern: &str,
                resolve_aliases: bool,
            ) -> Result<Vec<StoredEntry>> {
                (**self).get_all(namespace, pattern, resolve_aliases)
            }

            fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
                (**self).exists(namespace, name)
            }

            fn create_alias(
                &self,
                namespace: &str,
                existing_name: &str,
                alias_name: &str,
            ) -> Result<()> {
                (**self).create_alias(namespace, existing_name, alias_name)
            }

            fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
                (**self).resolve_alias(namespace, alias_name)
            }

            fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>> {
                (**self).list_names(namespace, pattern)
            }

            fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
                (**self).delete(namespace, name)
            }

            fn delete_namespace(&self, namespace: &str) -> Result<()> {
                (**self).delete_namespace(namespace)
            }
        }
    };
}

forward_blob_store!(&T);
forward_blob_store!(Box<T>);
forward_blob_store!(Arc<T>);
