//! Atomic write primitives
//!
//! Uses temp→fsync→rename so readers never observe a partial file. The temp
//! file is dot-prefixed, so directory listings that skip hidden names never
//! return it.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use uuid::Uuid;

/// Atomically write bytes to a file, replacing any previous content
///
/// Creates the parent directory if needed. On unix the parent directory is
/// fsynced after the rename so the new name survives a crash.
///
/// # Errors
///
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = target_path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent")
    })?;
    let file_name = target_path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no file name"))?;

    fs::create_dir_all(parent)?;

    let temp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result = write_and_rename(&temp_path, target_path, content).and_then(|()| sync_dir(parent));
    if result.is_err() {
        fs::remove_file(&temp_path).ok();
    }
    result
}

fn write_and_rename(temp_path: &Path, target_path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, target_path)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
