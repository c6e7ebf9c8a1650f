//! Filesystem-backed versioned blob store
//!
//! Layout:
//!
//! ```text
//! {root}/{namespace}/{version_name}            payload bytes
//! {root}/{namespace}/.aliases/{alias_name}     target version name (UTF-8)
//! ```
//!
//! Namespaces and names are stored through [`encode_segment`], so names
//! holding `/` (HDFS-path URNs) map to a single file and listings decode them
//! back.
//!
//! Every write goes through [`atomic_write`], so an alias swap replaces the
//! pointer file in one rename.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use runstate_core::errors::RunStateError;
use runstate_core::naming::{glob_match, validate_name};
use runstate_core::ports::{StoredEntry, VersionedBlobStore};

use crate::errors::{io_read, io_write, Result};
use crate::fs::atomic::atomic_write;
use crate::fs::segment::{decode_segment, encode_segment};

const ALIAS_DIR: &str = ".aliases";

#[derive(Clone, Copy)]
enum Listed {
    Version,
    Alias,
}

/// Filesystem-backed versioned blob store
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`; directories are created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(encode_segment(namespace))
    }

    fn version_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.namespace_dir(namespace).join(encode_segment(name))
    }

    fn alias_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.namespace_dir(namespace)
            .join(ALIAS_DIR)
            .join(encode_segment(name))
    }

    fn read_alias_target(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.alias_path(namespace, alias_name)) {
            Ok(target) => Ok(Some(target.trim_end().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_read(namespace, alias_name, e)),
        }
    }

    fn read_version(&self, namespace: &str, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.version_path(namespace, name)) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_read(namespace, name, e)),
        }
    }

    fn is_version(&self, namespace: &str, name: &str) -> Result<bool> {
        path_is_file(&self.version_path(namespace, name)).map_err(|e| io_read(namespace, name, e))
    }

    /// Versions and aliases of `namespace` matching `pattern`, sorted by name
    fn list(&self, namespace: &str, pattern: &str) -> Result<BTreeMap<String, Listed>> {
        let dir = self.namespace_dir(namespace);
        let mut listed = BTreeMap::new();

        let alias_dir = dir.join(ALIAS_DIR);
        for (segments_dir, kind) in [(&dir, Listed::Version), (&alias_dir, Listed::Alias)] {
            for segment in file_names(segments_dir).map_err(|e| io_read(namespace, pattern, e))? {
                let Some(name) = decode_segment(&segment) else {
                    tracing::warn!(namespace, file = %segment, "Skipping undecodable file name");
                    continue;
                };
                if glob_match(pattern, &name) {
                    listed.insert(name, kind);
                }
            }
        }
        Ok(listed)
    }
}

impl VersionedBlobStore for FsBlobStore {
    fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()> {
        validate_name(namespace)?;
        validate_name(name)?;

        if self.read_alias_target(namespace, name)?.is_some() {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is an alias in namespace '{}'",
                name, namespace
            )));
        }

        atomic_write(&self.version_path(namespace, name), payload)
            .map_err(|e| io_write(namespace, name, e))?;
        tracing::debug!(namespace, name, bytes = payload.len(), "Wrote version file");
        Ok(())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        validate_name(namespace)?;
        validate_name(name)?;

        if let Some(payload) = self.read_version(namespace, name)? {
            return Ok(payload);
        }
        match self.read_alias_target(namespace, name)? {
            Some(target) => self
                .read_version(namespace, &target)?
                .ok_or_else(|| RunStateError::not_found(namespace, &target)),
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

        let mut out = Vec::new();
        for (name, kind) in self.list(namespace, pattern)? {
            match kind {
                Listed::Version => {
                    // Deleted between listing and reading
                    if let Some(payload) = self.read_version(namespace, &name)? {
                        out.push(StoredEntry {
                            name,
                            alias_target: None,
                            payload,
                        });
                    }
                }
                Listed::Alias if resolve_aliases => {
                    let Some(target) = self.read_alias_target(namespace, &name)? else {
                        continue;
                    };
                    match self.read_version(namespace, &target)? {
                        Some(payload) => out.push(StoredEntry {
                            name,
                            alias_target: Some(target),
                            payload,
                        }),
                        None => {
                            tracing::warn!(namespace, alias = %name, target = %target, "Skipping dangling alias");
                        }
                    }
                }
                Listed::Alias => {}
            }
        }
        Ok(out)
    }

    fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        if self.is_version(namespace, name)? {
            return Ok(true);
        }
        path_is_file(&self.alias_path(namespace, name)).map_err(|e| io_read(namespace, name, e))
    }

    fn create_alias(&self, namespace: &str, existing_name: &str, alias_name: &str) -> Result<()> {
        validate_name(namespace)?;
        validate_name(existing_name)?;
        validate_name(alias_name)?;

        if !self.is_version(namespace, existing_name)? {
            return Err(RunStateError::not_found(namespace, existing_name));
        }
        if self.is_version(namespace, alias_name)? {
            return Err(RunStateError::invalid_input(format!(
                "'{}' is a version entry in namespace '{}'",
                alias_name, namespace
            )));
        }

        atomic_write(
            &self.alias_path(namespace, alias_name),
            existing_name.as_bytes(),
        )
        .map_err(|e| io_write(namespace, alias_name, e))?;
        tracing::debug!(namespace, alias = alias_name, target = existing_name, "Repointed alias");
        Ok(())
    }

    fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
        validate_name(namespace)?;
        validate_name(alias_name)?;
        self.read_alias_target(namespace, alias_name)
    }

    fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>> {
        validate_name(namespace)?;
        Ok(self.list(namespace, pattern)?.into_keys().collect())
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        validate_name(namespace)?;
        validate_name(name)?;

        let removed_version = remove_file_if_exists(&self.version_path(namespace, name))
            .map_err(|e| io_write(namespace, name, e))?;
        let removed_alias = remove_file_if_exists(&self.alias_path(namespace, name))
            .map_err(|e| io_write(namespace, name, e))?;
        Ok(removed_version || removed_alias)
    }

    fn delete_namespace(&self, namespace: &str) -> Result<()> {
        validate_name(namespace)?;

        match fs::remove_dir_all(self.namespace_dir(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_write(namespace, "*", e)),
        }
    }
}

/// Regular files in `dir`, skipping dot-prefixed bookkeeping entries
///
/// A missing directory lists as empty.
fn file_names(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn path_is_file(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
