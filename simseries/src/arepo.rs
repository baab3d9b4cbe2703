//! Series of AREPO simulation outputs.
//!
//! An AREPO run directory looks like:
//!
//! ```text
//! <run>/
//!   output/
//!     snapdir_000/   snapshot chunks for output 0
//!     groups_000/    group/subhalo catalog for output 0
//!     snapdir_001/
//!     groups_001/
//!     ...
//! ```
//!
//! Every snapshot directory is one series member; the group directory with
//! the same position is passed to the reader as the member's catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, SeriesError};
use crate::paths::{glob_in, PathSet};
use crate::registry::{SeriesContext, SeriesType};
use crate::series::DatasetSeries;

/// Registry name of the AREPO series kind.
pub const AREPO_SERIES_NAME: &str = "arepo";

const OUTPUT_DIR: &str = "output";
const SNAPDIR_PREFIX: &str = "snapdir";
const SNAPDIR_PATTERN: &str = "snapdir_*";
const GROUPS_PATTERN: &str = "groups_*";

fn snapdir_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^snapdir_(\d+)$").unwrap())
}

/// An AREPO run as a series of snapshots.
#[derive(Debug)]
pub struct ArepoSimulation {
    root: PathBuf,
    name: String,
    series: DatasetSeries,
}

impl ArepoSimulation {
    /// Open the run rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::InvalidPath`] if `root` does not exist
    /// - [`SeriesError::EmptySeries`] if there are no snapshot directories
    /// - [`SeriesError::InconsistentSeriesLayout`] if the numbers of
    ///   snapshot and group directories differ
    /// - [`SeriesError::UnknownFormat`] if no reader accepts the first
    ///   snapshot
    /// - anything [`DatasetSeries::new`] returns
    pub fn open(root: &Path, context: &SeriesContext) -> Result<Self> {
        if !root.exists() {
            return Err(SeriesError::InvalidPath(root.to_path_buf()));
        }

        let output = root.join(OUTPUT_DIR);
        let snapshots = discover(&output, SNAPDIR_PATTERN)?;
        let groups = discover(&output, GROUPS_PATTERN)?;

        if snapshots.is_empty() {
            return Err(SeriesError::EmptySeries(root.to_path_buf()));
        }
        if snapshots.len() != groups.len() {
            return Err(SeriesError::InconsistentSeriesLayout {
                what: "group catalogs".to_string(),
                expected: snapshots.len(),
                found: groups.len(),
            });
        }

        let dispatch = context.dispatcher.determine_type(&snapshots[0])?;
        let dataset_type = dispatch
            .primary()
            .cloned()
            .ok_or_else(|| SeriesError::UnknownFormat(snapshots[0].clone()))?;

        tracing::info!(
            root = %root.display(),
            snapshots = snapshots.len(),
            format = %dispatch.format,
            "Opening AREPO simulation"
        );

        let args = context.args.clone().with_catalogs(groups);
        let series = DatasetSeries::builder(dataset_type)
            .args(args)
            .cache(context.cache.clone())
            .parallel_open(context.parallel_open)
            .build(PathSet::from_paths(snapshots)?)?;

        Ok(Self {
            name: run_name(root),
            root: root.to_path_buf(),
            series,
        })
    }

    /// Whether `path` looks like an AREPO run: a directory whose `output/`
    /// holds at least one `snapdir*` directory.
    pub fn validate_path(path: &Path) -> bool {
        let output = path.join(OUTPUT_DIR);
        if !path.is_dir() || !output.is_dir() {
            return false;
        }

        fs::read_dir(&output)
            .map(|entries| {
                entries.flatten().any(|entry| {
                    entry.path().is_dir()
                        && entry.file_name().to_string_lossy().starts_with(SNAPDIR_PREFIX)
                })
            })
            .unwrap_or(false)
    }

    /// Run name, the basename of the root directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root directory of the run.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The snapshot series.
    pub fn series(&self) -> &DatasetSeries {
        &self.series
    }

    /// Consume the simulation, keeping only the series.
    pub fn into_series(self) -> DatasetSeries {
        self.series
    }

    /// Output numbers parsed from the `snapdir_NNN` names, in member order.
    pub fn snapshot_numbers(&self) -> Vec<Option<u32>> {
        self.series
            .paths()
            .iter()
            .map(|path| snapshot_number(path))
            .collect()
    }
}

/// The AREPO kind for the series registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArepoSeriesType;

impl SeriesType for ArepoSeriesType {
    fn name(&self) -> &str {
        AREPO_SERIES_NAME
    }

    fn validate_path(&self, path: &Path) -> bool {
        ArepoSimulation::validate_path(path)
    }

    fn open(&self, path: &Path, context: &SeriesContext) -> Result<DatasetSeries> {
        ArepoSimulation::open(path, context).map(ArepoSimulation::into_series)
    }
}

fn discover(output: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !output.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = glob_in(output, pattern)?;
    paths.sort();
    Ok(paths)
}

fn snapshot_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    snapdir_regex()
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

fn run_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MetadataCache;
    use crate::dispatch::TypeRegistry;
    use crate::series::CacheStatus;
    use crate::testing::{write_member, JsonHeader, JsonHeaderType, HEADER_FILE};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_run(root: &Path, redshifts: &[f64]) {
        for (i, z) in redshifts.iter().enumerate() {
            let snap = root.join(OUTPUT_DIR).join(format!("snapdir_{:03}", i));
            write_member(&snap, HEADER_FILE, &format!("{{\"redshift\": {:?}}}", z));
            fs::create_dir_all(root.join(OUTPUT_DIR).join(format!("groups_{:03}", i))).unwrap();
        }
    }

    fn context(ty: Arc<JsonHeaderType>) -> SeriesContext {
        SeriesContext::new(Arc::new(TypeRegistry::new().with(ty)))
    }

    #[test]
    fn test_validate_path() {
        let temp = TempDir::new().unwrap();
        assert!(!ArepoSimulation::validate_path(temp.path()));

        fs::create_dir_all(temp.path().join("output/groups_000")).unwrap();
        assert!(!ArepoSimulation::validate_path(temp.path()));

        fs::write(temp.path().join("output/snapdir_file"), "").unwrap();
        assert!(!ArepoSimulation::validate_path(temp.path()));

        fs::create_dir_all(temp.path().join("output/snapdir_000")).unwrap();
        assert!(ArepoSimulation::validate_path(temp.path()));
    }

    #[test]
    fn test_validate_nonexistent_path() {
        assert!(!ArepoSimulation::validate_path(Path::new("/nonexistent/run")));
    }

    #[test]
    fn test_open_pairs_snapshots_with_groups() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("L35n270");
        create_run(&root, &[3.0, 1.0, 0.0]);

        let ty = Arc::new(JsonHeaderType::default());
        let sim = ArepoSimulation::open(&root, &context(ty.clone())).unwrap();

        assert_eq!(sim.name(), "L35n270");
        assert_eq!(sim.root(), root.as_path());
        assert_eq!(sim.series().len(), 3);
        assert_eq!(sim.snapshot_numbers(), vec![Some(0), Some(1), Some(2)]);
        assert_eq!(ty.opened(), 3);

        let dataset = sim.series().get_dataset(1).unwrap();
        let header = dataset.as_any().downcast_ref::<JsonHeader>().unwrap();
        assert_eq!(
            header.catalog.as_deref(),
            Some(root.join("output/groups_001").as_path())
        );
    }

    #[test]
    fn test_open_uses_cache_on_second_open() {
        let temp = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let root = temp.path().join("run");
        create_run(&root, &[2.0, 1.0, 0.5, 0.1]);

        let ty = Arc::new(JsonHeaderType::default());
        let ctx = context(ty.clone()).with_cache(MetadataCache::new(cache_dir.path()));

        let first = ArepoSimulation::open(&root, &ctx).unwrap();
        assert_eq!(first.series().cache_status(), CacheStatus::Miss);

        let second = ArepoSimulation::open(&root, &ctx).unwrap();
        assert_eq!(second.series().cache_status(), CacheStatus::Hit);
        assert_eq!(ty.opened(), 4);

        let index = second
            .series()
            .select_index(&crate::query::Query::new().with("redshift", 0.5))
            .unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_open_missing_root() {
        let ctx = context(Arc::new(JsonHeaderType::default()));
        let err = ArepoSimulation::open(Path::new("/nonexistent/run"), &ctx).unwrap_err();
        assert!(matches!(err, SeriesError::InvalidPath(_)));
    }

    #[test]
    fn test_open_without_snapshots() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("output")).unwrap();

        let ctx = context(Arc::new(JsonHeaderType::default()));
        let err = ArepoSimulation::open(temp.path(), &ctx).unwrap_err();
        assert!(matches!(err, SeriesError::EmptySeries(_)));
    }

    #[test]
    fn test_open_mismatched_groups() {
        let temp = TempDir::new().unwrap();
        create_run(temp.path(), &[1.0, 0.0]);
        fs::remove_dir(temp.path().join("output/groups_001")).unwrap();

        let ctx = context(Arc::new(JsonHeaderType::default()));
        let err = ArepoSimulation::open(temp.path(), &ctx).unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InconsistentSeriesLayout {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_open_unknown_format() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("output/snapdir_000")).unwrap();
        fs::create_dir_all(temp.path().join("output/groups_000")).unwrap();

        let ctx = context(Arc::new(JsonHeaderType::default()));
        let err = ArepoSimulation::open(temp.path(), &ctx).unwrap_err();
        assert!(matches!(err, SeriesError::UnknownFormat(_)));
    }

    #[test]
    fn test_snapshot_number() {
        assert_eq!(snapshot_number(Path::new("/r/output/snapdir_042")), Some(42));
        assert_eq!(snapshot_number(Path::new("/r/output/snapdir_x")), None);
        assert_eq!(snapshot_number(Path::new("/r/output/groups_042")), None);
    }

    #[test]
    fn test_series_type_registry_entry() {
        let temp = TempDir::new().unwrap();
        create_run(temp.path(), &[0.0]);

        let kind = ArepoSeriesType;
        assert_eq!(kind.name(), AREPO_SERIES_NAME);
        assert!(kind.validate_path(temp.path()));

        let series = kind
            .open(temp.path(), &context(Arc::new(JsonHeaderType::default())))
            .unwrap();
        assert_eq!(series.len(), 1);
    }
}
