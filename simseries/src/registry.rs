//! Process-wide registry of series kinds.
//!
//! A series kind knows how to recognize the directory layout of one
//! simulation family and how to build a [`DatasetSeries`] from it. Kinds are
//! registered explicitly, usually once at startup:
//!
//! ```ignore
//! simseries::register_builtin_series_types();
//! if let Some(kind) = simseries::classify_series(path) {
//!     let series = kind.open(path, &context)?;
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::arepo::ArepoSeriesType;
use crate::cache::MetadataCache;
use crate::config::SeriesConfig;
use crate::dispatch::TypeDispatch;
use crate::error::Result;
use crate::reader::InterfaceArgs;
use crate::series::DatasetSeries;

/// Everything a series kind needs to open a series.
#[derive(Clone)]
pub struct SeriesContext {
    /// Resolves member paths to reader types.
    pub dispatcher: Arc<dyn TypeDispatch>,

    /// Metadata cache used for the series.
    pub cache: MetadataCache,

    /// Member construction arguments.
    pub args: InterfaceArgs,

    /// Open members in parallel when metadata must be computed.
    pub parallel_open: bool,
}

impl SeriesContext {
    /// Context with no cache, no arguments and parallel opening.
    pub fn new(dispatcher: Arc<dyn TypeDispatch>) -> Self {
        Self {
            dispatcher,
            cache: MetadataCache::disabled(),
            args: InterfaceArgs::default(),
            parallel_open: true,
        }
    }

    /// Set the metadata cache.
    pub fn with_cache(mut self, cache: MetadataCache) -> Self {
        self.cache = cache;
        self
    }

    /// Set the member construction arguments.
    pub fn with_args(mut self, args: InterfaceArgs) -> Self {
        self.args = args;
        self
    }

    /// Apply cache and parallelism settings from a configuration.
    pub fn with_config(mut self, config: &SeriesConfig) -> Self {
        self.cache = MetadataCache::from_config(config);
        self.parallel_open = config.parallel_open;
        self
    }
}

impl fmt::Debug for SeriesContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesContext")
            .field("cache", &self.cache)
            .field("args", &self.args)
            .field("parallel_open", &self.parallel_open)
            .finish_non_exhaustive()
    }
}

/// A kind of series recognized by its directory layout.
pub trait SeriesType: Send + Sync {
    /// Registry name, e.g. `"arepo"`.
    fn name(&self) -> &str;

    /// Whether `path` has this kind's layout. Never fails.
    fn validate_path(&self, path: &Path) -> bool;

    /// Build the series rooted at `path`.
    fn open(&self, path: &Path, context: &SeriesContext) -> Result<DatasetSeries>;
}

type Registry = RwLock<HashMap<String, Arc<dyn SeriesType>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a series kind under its name, replacing any previous kind of
/// the same name.
pub fn register_series_type(series_type: Arc<dyn SeriesType>) {
    let name = series_type.name().to_string();
    let replaced = registry()
        .write()
        .insert(name.clone(), series_type)
        .is_some();

    tracing::debug!(name = %name, replaced, "Registered series type");
}

/// Look up a series kind by name.
pub fn lookup_series_type(name: &str) -> Option<Arc<dyn SeriesType>> {
    registry().read().get(name).cloned()
}

/// Names of all registered kinds, sorted.
pub fn registered_series_types() -> Vec<String> {
    let mut names: Vec<String> = registry().read().keys().cloned().collect();
    names.sort();
    names
}

/// First registered kind, in name order, that accepts `path`.
pub fn classify_series(path: &Path) -> Option<Arc<dyn SeriesType>> {
    let mut kinds: Vec<(String, Arc<dyn SeriesType>)> = registry()
        .read()
        .iter()
        .map(|(name, kind)| (name.clone(), Arc::clone(kind)))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));

    // Validation touches the filesystem, so it runs without the lock held.
    kinds
        .into_iter()
        .map(|(_, kind)| kind)
        .find(|kind| kind.validate_path(path))
}

/// Register the series kinds shipped with this crate. Safe to call
/// repeatedly.
pub fn register_builtin_series_types() {
    register_series_type(Arc::new(ArepoSeriesType));
}
