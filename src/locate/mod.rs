//! Path locators.
//!
//! A locator resolves the concrete path of one pipeline output from a search
//! root and naming parameters. Locators do no validation beyond "exactly one
//! existing path matches"; rules decide what a missing path means and can
//! use `?` to turn a `LocateError` into a rule error.

pub mod bulk_rnaseq;

use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("target does not exist. Expected: {}. Pattern: {pattern}", .expected.display())]
    NotFound { expected: PathBuf, pattern: String },

    #[error("one and only one target should match. Found: {found:?}. Pattern: {pattern}")]
    Ambiguous { found: Vec<PathBuf>, pattern: String },
}

/// Finds one specific path.
pub trait Locator {
    /// Naming parameters for a lookup.
    type Query;

    fn find(&self, query: &Self::Query) -> Result<PathBuf, LocateError>;
}

/// Resolve `relative` under `search_root`, requiring the path to exist.
pub fn locate_exact(search_root: &Path, relative: &Path) -> Result<PathBuf, LocateError> {
    let pattern = relative.display().to_string();
    debug!(root = %search_root.display(), %pattern, "locating path");

    let candidate = search_root.join(relative);
    if !candidate.exists() {
        return Err(LocateError::NotFound {
            expected: candidate,
            pattern,
        });
    }

    Ok(candidate)
}

/// Find the single entry of `search_root/relative_dir` whose file name matches
/// `pattern`.
pub fn locate_pattern(
    search_root: &Path,
    relative_dir: &Path,
    pattern: &Regex,
) -> Result<PathBuf, LocateError> {
    let dir = search_root.join(relative_dir);
    debug!(dir = %dir.display(), pattern = pattern.as_str(), "locating path by pattern");

    let not_found = || LocateError::NotFound {
        expected: dir.clone(),
        pattern: pattern.as_str().to_string(),
    };
    let entries = std::fs::read_dir(&dir).map_err(|_| not_found())?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| pattern.is_match(name))
                .unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect();
    found.sort();

    match found.len() {
        0 => Err(not_found()),
        1 => Ok(found.remove(0)),
        _ => Err(LocateError::Ambiguous {
            found,
            pattern: pattern.as_str().to_string(),
        }),
    }
}
