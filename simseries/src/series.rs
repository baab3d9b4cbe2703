//! The dataset series orchestrator.
//!
//! A [`DatasetSeries`] is an ordered collection of member datasets of one
//! reader type, plus the aggregated metadata of all members. Construction
//! takes one of two paths:
//!
//! ```text
//! paths ─► hash ─► cache lookup ─┬─ hit ──► lazy members (no I/O)
//!                                └─ miss ─► open all members ─► harvest metadata ─► store
//! ```
//!
//! On a hit, members are opened only when first accessed. On a miss, every
//! member is opened (in parallel when enabled) and the first reader error
//! aborts construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::{series_hash, MetadataCache};
use crate::config::SeriesConfig;
use crate::error::{Result, SeriesError};
use crate::lazy::Member;
use crate::metadata::SeriesMetadata;
use crate::paths::PathSet;
use crate::query::{select_index, Query};
use crate::reader::{Dataset, DatasetType, InterfaceArgs, ReaderArgs};

/// Where a series' metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Read from the metadata cache; members start unopened.
    Hit,
    /// Computed by opening every member.
    Miss,
}

/// Builder for [`DatasetSeries`].
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    dataset_type: Arc<dyn DatasetType>,
    args: InterfaceArgs,
    cache: MetadataCache,
    parallel_open: bool,
}

impl SeriesBuilder {
    /// Builder for a series of `dataset_type` members with no cache.
    pub fn new(dataset_type: Arc<dyn DatasetType>) -> Self {
        Self {
            dataset_type,
            args: InterfaceArgs::default(),
            cache: MetadataCache::disabled(),
            parallel_open: true,
        }
    }

    /// Set the member construction arguments.
    pub fn args(mut self, args: InterfaceArgs) -> Self {
        self.args = args;
        self
    }

    /// Set the metadata cache.
    pub fn cache(mut self, cache: MetadataCache) -> Self {
        self.cache = cache;
        self
    }

    /// Open members in parallel when metadata must be computed.
    pub fn parallel_open(mut self, parallel: bool) -> Self {
        self.parallel_open = parallel;
        self
    }

    /// Apply cache and parallelism settings from a configuration.
    pub fn config(self, config: &SeriesConfig) -> Self {
        self.cache(MetadataCache::from_config(config))
            .parallel_open(config.parallel_open)
    }

    /// Validate `paths` and build the series.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidPath`] before any member is opened if
    /// one of the paths does not exist.
    pub fn build_paths<I, P>(self, paths: I) -> Result<DatasetSeries>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths = PathSet::from_paths(paths)?;
        self.build(paths)
    }

    /// Build a series from the entries of `dir` matching `pattern`.
    pub fn build_from_directory(self, dir: &Path, pattern: Option<&str>) -> Result<DatasetSeries> {
        let paths = PathSet::from_directory(dir, pattern)?;
        self.build(paths)
    }

    /// Build the series over already validated paths.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::InconsistentSeriesLayout`] if per-member arguments
    ///   do not match the number of paths
    /// - [`SeriesError::Reader`] if metadata must be computed and a member
    ///   fails to open
    pub fn build(self, paths: PathSet) -> Result<DatasetSeries> {
        let paths = paths.into_vec();
        let args = self.args.pair(paths.len())?;
        let hash = series_hash(&paths);

        let cached = self
            .cache
            .load_cached(&hash)
            .filter(|metadata| {
                let usable = metadata.len() == paths.len();
                if !usable {
                    tracing::warn!(
                        hash = %hash,
                        cached = metadata.len(),
                        paths = paths.len(),
                        "Cached metadata does not match series length, recomputing"
                    );
                }
                usable
            });

        let (members, metadata, cache_status) = match cached {
            Some(metadata) => {
                let members = paths
                    .iter()
                    .zip(args)
                    .map(|(path, args)| {
                        Member::lazy(path.clone(), Arc::clone(&self.dataset_type), args)
                    })
                    .collect();
                (members, metadata, CacheStatus::Hit)
            }
            None => {
                let members = open_members(&paths, &args, &self.dataset_type, self.parallel_open)?;
                let metadata = SeriesMetadata::from_members(
                    members
                        .iter()
                        .map(Member::metadata)
                        .collect::<Result<Vec<_>>>()?,
                );

                if let Err(e) = self.cache.store_cached(&hash, &metadata) {
                    tracing::warn!(hash = %hash, error = %e, "Failed to store series metadata");
                }

                (members, metadata, CacheStatus::Miss)
            }
        };

        tracing::debug!(
            hash = %hash,
            members = paths.len(),
            dataset_type = self.dataset_type.name(),
            cache = ?cache_status,
            "Built dataset series"
        );

        Ok(DatasetSeries {
            paths,
            hash,
            dataset_type: self.dataset_type,
            members,
            metadata,
            cache_status,
        })
    }
}

fn open_members(
    paths: &[PathBuf],
    args: &[ReaderArgs],
    dataset_type: &Arc<dyn DatasetType>,
    parallel: bool,
) -> Result<Vec<Member>> {
    let open = |(path, args): (&PathBuf, &ReaderArgs)| {
        Member::open(path.clone(), Arc::clone(dataset_type), args)
    };

    if parallel {
        paths.par_iter().zip(args.par_iter()).map(open).collect()
    } else {
        paths.iter().zip(args.iter()).map(open).collect()
    }
}

/// An ordered collection of member datasets with aggregated metadata.
pub struct DatasetSeries {
    paths: Vec<PathBuf>,
    hash: String,
    dataset_type: Arc<dyn DatasetType>,
    members: Vec<Member>,
    metadata: SeriesMetadata,
    cache_status: CacheStatus,
}

impl DatasetSeries {
    /// Start building a series of `dataset_type` members.
    pub fn builder(dataset_type: Arc<dyn DatasetType>) -> SeriesBuilder {
        SeriesBuilder::new(dataset_type)
    }

    /// Build a series over `paths` using `cache`.
    pub fn new(
        paths: PathSet,
        dataset_type: Arc<dyn DatasetType>,
        args: InterfaceArgs,
        cache: MetadataCache,
    ) -> Result<Self> {
        SeriesBuilder::new(dataset_type)
            .args(args)
            .cache(cache)
            .build(paths)
    }

    /// Build a series from the entries of `dir` matching `pattern`
    /// (default: everything directly under `dir`).
    pub fn from_directory(
        dir: &Path,
        pattern: Option<&str>,
        dataset_type: Arc<dyn DatasetType>,
        args: InterfaceArgs,
        cache: MetadataCache,
    ) -> Result<Self> {
        SeriesBuilder::new(dataset_type)
            .args(args)
            .cache(cache)
            .build_from_directory(dir, pattern)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the series has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member paths in order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Identity hash of the series.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Reader type of every member.
    pub fn dataset_type(&self) -> &Arc<dyn DatasetType> {
        &self.dataset_type
    }

    /// Aggregated member metadata. Never performs I/O.
    pub fn metadata(&self) -> &SeriesMetadata {
        &self.metadata
    }

    /// Members in order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Member at `index`, without opening it.
    pub fn member(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }

    /// Whether the metadata came from the cache.
    pub fn cache_status(&self) -> CacheStatus {
        self.cache_status
    }

    /// Number of members opened so far.
    pub fn loaded_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_loaded()).count()
    }

    /// Dataset at `index`, opening it if necessary.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::IndexOutOfRange`] if `index >= len()`
    /// - [`SeriesError::Reader`] if the member fails to open
    pub fn get_dataset(&self, index: usize) -> Result<Arc<dyn Dataset>> {
        self.members
            .get(index)
            .ok_or(SeriesError::IndexOutOfRange {
                index,
                len: self.members.len(),
            })?
            .dataset()
    }

    /// Position of the member best matching `query`.
    ///
    /// See [`select_index`] for the matching rules.
    pub fn select_index(&self, query: &Query) -> Result<usize> {
        select_index(&self.metadata, query)
    }

    /// Dataset best matching `query`, opening it if necessary.
    pub fn select(&self, query: &Query) -> Result<Arc<dyn Dataset>> {
        let index = self.select_index(query)?;
        self.get_dataset(index)
    }

    /// Dataset by explicit index, or else by query.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InvalidQuery`] if `index` is `None` and the
    /// query is empty.
    pub fn get(&self, index: Option<usize>, query: &Query) -> Result<Arc<dyn Dataset>> {
        match index {
            Some(index) => self.get_dataset(index),
            None => self.select(query),
        }
    }
}

impl fmt::Debug for DatasetSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetSeries")
            .field("hash", &self.hash)
            .field("dataset_type", &self.dataset_type.name())
            .field("members", &self.members.len())
            .field("loaded", &self.loaded_count())
            .field("cache_status", &self.cache_status)
            .finish()
    }
}
