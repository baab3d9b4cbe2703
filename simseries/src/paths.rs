//! Resolution of member paths for a series.
//!
//! A [`PathSet`] is an ordered list of paths that all existed when the set
//! was built. Validation happens up front so that a single missing member
//! fails the whole series before any dataset is opened.

use std::path::{Path, PathBuf};

use crate::error::{Result, SeriesError};

/// Glob pattern used by directory discovery when none is given.
pub const DEFAULT_PATTERN: &str = "*";

/// An ordered, validated list of existing filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    paths: Vec<PathBuf>,
}

impl PathSet {
    /// Validate paths in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidPath`] for the first path that does not
    /// exist.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();

        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            return Err(SeriesError::InvalidPath(missing.clone()));
        }

        Ok(Self { paths })
    }

    /// Collect the entries of `dir` matching `pattern`.
    ///
    /// The pattern is relative to `dir` and defaults to [`DEFAULT_PATTERN`],
    /// which matches everything directly under the directory. Matches are
    /// sorted lexicographically so the member order does not depend on the
    /// filesystem's enumeration order.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::InvalidPath`] if `dir` does not exist
    /// - [`SeriesError::InvalidPattern`] if the pattern cannot be parsed
    pub fn from_directory(dir: &Path, pattern: Option<&str>) -> Result<Self> {
        if !dir.exists() {
            return Err(SeriesError::InvalidPath(dir.to_path_buf()));
        }

        let pattern = pattern.unwrap_or(DEFAULT_PATTERN);
        let mut paths = glob_in(dir, pattern)?;
        paths.sort();

        tracing::debug!(
            dir = %dir.display(),
            pattern,
            matches = paths.len(),
            "Resolved series paths from directory"
        );

        Ok(Self { paths })
    }

    /// Return the set sorted lexicographically.
    pub fn sorted(mut self) -> Self {
        self.paths.sort();
        self
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate paths in order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Paths as a slice.
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Consume the set.
    pub fn into_vec(self) -> Vec<PathBuf> {
        self.paths
    }
}

/// Glob `pattern` relative to `dir`, returning matches in enumeration order.
///
/// Unreadable entries are skipped.
pub(crate) fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", escaped.trim_end_matches('/'), pattern);

    let entries = glob::glob(&full).map_err(|e| SeriesError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    Ok(entries.flatten().collect())
}
