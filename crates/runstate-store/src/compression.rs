//! Gzip-compressed stored values
//!
//! [`GzipBlobStore`] wraps any backend and gzips payloads on `put`. Reads
//! inflate values carrying the gzip magic bytes and pass others through, so a
//! store that switches compression on keeps reading its older entries.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use runstate_core::errors::RunStateError;
use runstate_core::ports::{StoredEntry, VersionedBlobStore};

use crate::errors::Result;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check if data starts with the gzip magic bytes
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Gzip `data`
///
/// # Errors
///
/// Returns the encoder's I/O error.
pub fn compress_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate gzip `data`
///
/// # Errors
///
/// Returns the decoder's I/O error for truncated or corrupt input.
pub fn decompress_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

fn codec_error(action: &str, namespace: &str, name: &str, err: io::Error) -> RunStateError {
    RunStateError::Serialization {
        message: format!("Failed to {} {}/{}: {}", action, namespace, name, err),
    }
}

/// Backend wrapper storing every payload gzip-compressed
#[derive(Debug, Clone)]
pub struct GzipBlobStore<S> {
    inner: S,
}

impl<S: VersionedBlobStore> GzipBlobStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped backend, which sees compressed payloads
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn inflate(&self, namespace: &str, name: &str, payload: Vec<u8>) -> Result<Vec<u8>> {
        if !is_gzip(&payload) {
            return Ok(payload);
        }
        decompress_gzip(&payload).map_err(|e| codec_error("decompress", namespace, name, e))
    }
}

impl<S: VersionedBlobStore> VersionedBlobStore for GzipBlobStore<S> {
    fn put(&self, namespace: &str, name: &str, payload: &[u8]) -> Result<()> {
        let compressed =
            compress_gzip(payload).map_err(|e| codec_error("compress", namespace, name, e))?;
        tracing::trace!(
            namespace,
            name,
            raw = payload.len(),
            compressed = compressed.len(),
            "Compressed payload"
        );
        self.inner.put(namespace, name, &compressed)
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>> {
        let payload = self.inner.get(namespace, name)?;
        self.inflate(namespace, name, payload)
    }

    fn get_all(
        &self,
        namespace: &str,
        pattern: &str,
        resolve_aliases: bool,
    ) -> Result<Vec<StoredEntry>> {
        self.inner
            .get_all(namespace, pattern, resolve_aliases)?
            .into_iter()
            .map(|entry| {
                let StoredEntry {
                    name,
                    alias_target,
                    payload,
                } = entry;
                let resolved = alias_target.as_deref().unwrap_or(&name);
                let payload = self.inflate(namespace, resolved, payload)?;
                Ok(StoredEntry {
                    name,
                    alias_target,
                    payload,
                })
            })
            .collect()
    }

    fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        self.inner.exists(namespace, name)
    }

    fn create_alias(&self, namespace: &str, existing_name: &str, alias_name: &str) -> Result<()> {
        self.inner.create_alias(namespace, existing_name, alias_name)
    }

    fn resolve_alias(&self, namespace: &str, alias_name: &str) -> Result<Option<String>> {
        self.inner.resolve_alias(namespace, alias_name)
    }

    fn list_names(&self, namespace: &str, pattern: &str) -> Result<Vec<String>> {
        self.inner.list_names(namespace, pattern)
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        self.inner.delete(namespace, name)
    }

    fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.inner.delete_namespace(namespace)
    }
}
