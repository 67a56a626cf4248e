//! Input discovery: enumerate candidate frames in a directory.

use std::path::{Path, PathBuf};

use crate::IoError;

/// True when `name` begins with `prefix` and ends with `suffix`.
///
/// Both affixes must fit: a name shorter than either can never match.
/// Empty affixes match everything.
#[must_use]
pub fn matches_affixes(name: &str, prefix: &str, suffix: &str) -> bool {
    name.starts_with(prefix) && name.ends_with(suffix)
}

/// Lexicographically ordered list of input candidates in `dir`:
/// regular files with a recognized extension whose names pass the
/// affix filter.
///
/// # Errors
///
/// [`IoError::Read`] when the directory cannot be enumerated.
pub fn discover_inputs(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>, IoError> {
    let read_error = |source| IoError::Read {
        path: dir.into(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }
        let path = entry.path();
        if crate::recognized_extension(&path).is_none() {
            continue;
        }
        let passes = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| matches_affixes(name, prefix, suffix));
        if passes {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
