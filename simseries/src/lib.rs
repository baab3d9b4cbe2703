//! simseries - Lazy, cached series of simulation snapshots
//!
//! This library presents a collection of large, multi-file simulation outputs
//! (for example every snapshot of one cosmological run) as a single ordered
//! series. Member datasets are opened only when needed, their scalar metadata
//! is aggregated and cached on disk under a hash of the member paths, and a
//! member can be picked by the values of its metadata fields.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use simseries::{DatasetSeries, MetadataCache, PathSet, Query, SeriesConfig};
//!
//! let config = SeriesConfig::load_default()?;
//! let series = DatasetSeries::builder(Arc::new(MySnapshotType))
//!     .config(&config)
//!     .build(PathSet::from_directory(run_dir, Some("snapshot_*"))?)?;
//!
//! let snapshot = series.select(&Query::new().with("redshift", 0.5))?;
//! ```
//!
//! Per-format readers are supplied by the caller through the
//! [`DatasetType`] and [`Dataset`] traits.

pub mod arepo;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lazy;
pub mod metadata;
pub mod paths;
pub mod query;
pub mod reader;
pub mod registry;
pub mod series;

#[cfg(test)]
mod testing;

pub use arepo::{ArepoSeriesType, ArepoSimulation, AREPO_SERIES_NAME};
pub use cache::{series_hash, CacheEntryInfo, ClearResult, MetadataCache};
pub use config::SeriesConfig;
pub use dispatch::{Dispatch, TypeDispatch, TypeRegistry};
pub use error::{CacheError, ReaderError, Result, SeriesError};
pub use lazy::Member;
pub use metadata::{MemberMetadata, MetadataValue, SeriesMetadata};
pub use paths::PathSet;
pub use query::{select_index, Criterion, Query};
pub use reader::{Dataset, DatasetType, InterfaceArgs, ReaderArgs};
pub use registry::{
    classify_series, lookup_series_type, register_builtin_series_types, register_series_type,
    registered_series_types, SeriesContext, SeriesType,
};
pub use series::{CacheStatus, DatasetSeries, SeriesBuilder};

/// Version of the simseries library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
