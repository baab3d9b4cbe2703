//! Error types for series construction, caching and selection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for series operations.
pub type Result<T> = std::result::Result<T, SeriesError>;

/// Error returned by a dataset reader when opening a member fails.
///
/// Readers are external collaborators, so their errors are carried opaquely
/// and surfaced unmodified as the source of [`SeriesError::Reader`].
pub type ReaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building or querying a series.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// A supplied or globbed path does not exist.
    #[error("specified path does not exist: {}", .0.display())]
    InvalidPath(PathBuf),

    /// The glob pattern used for directory discovery is malformed.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Paired per-member lists do not line up with the member paths.
    #[error("inconsistent series layout: {what} has {found} entries, expected {expected}")]
    InconsistentSeriesLayout {
        what: String,
        expected: usize,
        found: usize,
    },

    /// A selection was requested with neither an index nor any criteria.
    #[error("specify an index or at least one field to select for")]
    InvalidQuery,

    /// A numeric criterion targets NaN or infinity.
    #[error("target for '{field}' must be finite, got {value}")]
    NonFiniteTarget { field: String, value: f64 },

    /// Numeric criteria prefer different members.
    #[error("ambiguous selection request: fields {fields:?} prefer members {preferred:?}")]
    AmbiguousSelection {
        fields: Vec<String>,
        preferred: Vec<usize>,
    },

    /// No member satisfies the categorical criteria.
    #[error("no member matches the requested fields {fields:?}")]
    NoMatch { fields: Vec<String> },

    /// The nearest member lies outside the requested relative tolerance.
    #[error(
        "closest match for '{field}' is {observed} (requested {requested}, relative tolerance {tolerance})"
    )]
    OutOfTolerance {
        field: String,
        requested: f64,
        observed: f64,
        tolerance: f64,
    },

    /// A positional lookup past the end of the series.
    #[error("member index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A simulation directory contains no snapshots.
    #[error("no snapshots found under {}", .0.display())]
    EmptySeries(PathBuf),

    /// No registered dataset type can open the given path.
    #[error("unknown dataset format: {}", .0.display())]
    UnknownFormat(PathBuf),

    /// A dataset reader failed to open a member.
    #[error("failed to open dataset {}: {source}", path.display())]
    Reader {
        path: PathBuf,
        #[source]
        source: ReaderError,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the on-disk metadata cache.
///
/// Series construction never fails on these; a failed read is a miss and a
/// failed write only loses the speedup on the next run.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while reading or writing a cache entry.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache entry is not valid JSON for a metadata mapping.
    #[error("malformed cache entry {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache entry parsed but its positional keys are not `0..N-1`.
    #[error("cache entry {} has non-contiguous member keys", path.display())]
    Layout { path: PathBuf },

    /// Metadata holds a NaN or infinite float, which JSON cannot represent.
    #[error("member {member} field '{field}' is not finite and cannot be cached")]
    NonFinite { member: usize, field: String },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
