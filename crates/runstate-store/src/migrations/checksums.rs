//! Migration checksums
//!
//! SHA-256 of the embedded SQL is recorded when a migration is applied; a
//! later run with different SQL under the same id is refused.

use sha2::{Digest, Sha256};

use crate::errors::{checksum_mismatch, Result};

/// Hex-encoded SHA-256 of `content`
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Check the recorded checksum of an applied migration against its SQL
///
/// Rows applied without a checksum are accepted.
pub fn verify_checksum(migration_id: &str, recorded: Option<&str>, sql: &str) -> Result<()> {
    let actual = compute_checksum(sql);
    match recorded {
        Some(expected) if expected != actual => {
            Err(checksum_mismatch(migration_id, expected, &actual))
        }
        _ => Ok(()),
    }
}
