//! Naming rules for versions, aliases and store keys
//!
//! For dataset URN `urn:li:dataset:A` and job id `job_001`:
//!
//! - version name: `urn.li.dataset.A-job_001.dstate`
//! - alias name: `urn.li.dataset.A-current.dstate`
//!
//! The default dataset (empty URN) uses `job_001.dstate` and the legacy bare
//! alias `current.dstate`.
//!
//! Colons are replaced with periods before use because some backends treat
//! `:` as a key separator. Two URNs that differ only by `:` vs `.` therefore
//! map to the same names.

use crate::errors::{Result, RunStateError};

/// Suffix shared by every dataset state entry
pub const DATASET_STATE_SUFFIX: &str = ".dstate";

/// Marker used in alias names in place of a job id
pub const CURRENT_MARKER: &str = "current";

/// Glob matching every dataset-scoped alias
pub const DATASET_ALIAS_PATTERN: &str = "*-current.dstate";

/// Name of the legacy single-dataset alias
pub const LEGACY_ALIAS_NAME: &str = "current.dstate";

/// Replace `:` with `.` in a dataset URN
pub fn sanitize_dataset_urn(dataset_urn: &str) -> String {
    dataset_urn.replace(':', ".")
}

/// Version name for `(dataset_urn, job_id)`
pub fn version_name(dataset_urn: &str, job_id: &str) -> String {
    scoped_name(dataset_urn, job_id)
}

/// Alias name designating the latest version of `dataset_urn`
pub fn alias_name(dataset_urn: &str) -> String {
    scoped_name(dataset_urn, CURRENT_MARKER)
}

fn scoped_name(dataset_urn: &str, leaf: &str) -> String {
    let urn = sanitize_dataset_urn(dataset_urn);
    if urn.is_empty() {
        format!("{}{}", leaf, DATASET_STATE_SUFFIX)
    } else {
        format!("{}-{}{}", urn, leaf, DATASET_STATE_SUFFIX)
    }
}

/// Validate a namespace or entry name
///
/// Any non-empty string is a valid key. Dataset URNs routinely carry `/`
/// (HDFS paths, nested URNs), so backends with path semantics encode names
/// into safe segments themselves instead of restricting them here.
///
/// # Errors
///
/// Returns `InvalidName` for an empty name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RunStateError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Turn an arbitrary job name into a single safe path segment
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, as does a leading `.`.
pub fn sanitize_path_segment(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with('.') {
        out.replace_range(0..1, "_");
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Glob match supporting `*` (any run, possibly empty) and `?` (one char)
///
/// All other characters match literally.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0usize, 0usize);
    // Position of the last `*` seen and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(&c) if c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
