//! Directory listing for the start-up scan.

use std::path::{Path, PathBuf};

use super::error::WatchError;

/// List regular files in `dir` whose names satisfy `is_candidate`.
///
/// Names are sorted byte-wise so the first entry is a stable choice across
/// platforms. Entries with non UTF-8 names are skipped.
///
/// # Errors
///
/// Returns [`WatchError::Scan`] if the directory cannot be read.
pub fn scan_targets(
    dir: &Path,
    is_candidate: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, WatchError> {
    let entries = std::fs::read_dir(dir).map_err(|source| WatchError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_candidate(name.as_str()))
        .collect();
    names.sort();

    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}
