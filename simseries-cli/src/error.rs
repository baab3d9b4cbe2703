//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use simseries::{CacheError, SeriesError};

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Library error, including configuration errors.
    Series(SeriesError),
    /// Cache maintenance failed.
    Cache(CacheError),
    /// Argument is not a series hash.
    InvalidHash(String),
    /// No cache entry exists for the given hash.
    EntryNotFound(String),
    /// No registered series type accepts the directory.
    Unrecognized(PathBuf),
    /// Output could not be rendered.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Series(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::InvalidHash(hash) => write!(f, "'{}' is not a series hash", hash),
            CliError::EntryNotFound(hash) => write!(f, "No cache entry for series {}", hash),
            CliError::Unrecognized(path) => write!(
                f,
                "No registered series type recognizes {}",
                path.display()
            ),
            CliError::Output(msg) => write!(f, "Failed to render output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Series(e) => Some(e),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SeriesError> for CliError {
    fn from(e: SeriesError) -> Self {
        CliError::Series(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
