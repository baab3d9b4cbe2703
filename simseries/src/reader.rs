//! Contract between the series layer and per-format dataset readers.
//!
//! Readers are supplied by callers. A [`DatasetType`] knows how to open one
//! path into a [`Dataset`]; the series only needs the opened dataset's path
//! and its scalar metadata.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ReaderError, Result, SeriesError};
use crate::metadata::MemberMetadata;

/// An opened member dataset.
pub trait Dataset: Send + Sync {
    /// Path the dataset was opened from.
    fn path(&self) -> &Path;

    /// Scalar descriptive fields of this dataset.
    fn metadata(&self) -> MemberMetadata;

    /// Downcast support for callers that know the concrete reader.
    fn as_any(&self) -> &dyn Any;
}

/// A reader for one dataset format.
///
/// Implementations are usually zero-sized handles registered with a
/// [`TypeRegistry`](crate::dispatch::TypeRegistry).
pub trait DatasetType: Send + Sync {
    /// Format name, e.g. `"arepo-snapshot"`.
    fn name(&self) -> &str;

    /// Cheap check whether `path` looks like this format.
    ///
    /// Must not fail; unreadable paths are simply not accepted.
    fn probe(&self, path: &Path) -> bool;

    /// Open `path`, performing whatever I/O the format requires.
    fn open(
        &self,
        path: &Path,
        args: &ReaderArgs,
    ) -> std::result::Result<Box<dyn Dataset>, ReaderError>;
}

impl fmt::Debug for dyn Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path())
            .finish()
    }
}

impl fmt::Debug for dyn DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetType")
            .field("name", &self.name())
            .finish()
    }
}

/// Construction arguments for a single member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderArgs {
    /// Auxiliary catalog (group/halo file) belonging to this member.
    pub catalog: Option<PathBuf>,

    /// Reader-specific options.
    pub options: BTreeMap<String, String>,
}

impl ReaderArgs {
    /// Empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auxiliary catalog path.
    pub fn with_catalog(mut self, catalog: impl Into<PathBuf>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Set a reader option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up a reader option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Arguments for every member of a series, before pairing with paths.
///
/// Shared options apply to all members. Per-member options and catalogs
/// are lists that must have one entry per member path.
#[derive(Debug, Clone, Default)]
pub struct InterfaceArgs {
    shared: BTreeMap<String, String>,
    per_member: BTreeMap<String, Vec<String>>,
    catalogs: Option<Vec<PathBuf>>,
}

impl InterfaceArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option applied to every member.
    pub fn with_shared(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.shared.insert(key.into(), value.into());
        self
    }

    /// Add an option with one value per member.
    pub fn with_per_member<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.per_member
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Set one catalog path per member.
    pub fn with_catalogs<I, P>(mut self, catalogs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.catalogs = Some(catalogs.into_iter().map(Into::into).collect());
        self
    }

    /// Catalog list, if any.
    pub fn catalogs(&self) -> Option<&[PathBuf]> {
        self.catalogs.as_deref()
    }

    /// Produce one [`ReaderArgs`] per member.
    ///
    /// Per-member values override shared values with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::InconsistentSeriesLayout`] if any per-member
    /// list does not have exactly `count` entries.
    pub fn pair(&self, count: usize) -> Result<Vec<ReaderArgs>> {
        if let Some(catalogs) = &self.catalogs {
            check_len("catalog paths", count, catalogs.len())?;
        }
        for (key, values) in &self.per_member {
            check_len(&format!("option '{}'", key), count, values.len())?;
        }

        let args = (0..count)
            .map(|i| {
                let mut options = self.shared.clone();
                for (key, values) in &self.per_member {
                    options.insert(key.clone(), values[i].clone());
                }
                ReaderArgs {
                    catalog: self.catalogs.as_ref().map(|c| c[i].clone()),
                    options,
                }
            })
            .collect();

        Ok(args)
    }
}

fn check_len(what: &str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SeriesError::InconsistentSeriesLayout {
            what: what.to_string(),
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Header {
        path: PathBuf,
    }

    impl Dataset for Header {
        fn path(&self) -> &Path {
            &self.path
        }

        fn metadata(&self) -> MemberMetadata {
            MemberMetadata::new()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_dataset_debug_shows_path() {
        let dataset: std::sync::Arc<dyn Dataset> = std::sync::Arc::new(Header {
            path: PathBuf::from("/run/output/snapdir_007"),
        });
        let debug = format!("{:?}", dataset);

        assert!(debug.starts_with("Dataset"));
        assert!(debug.contains("snapdir_007"));
    }

    #[test]
    fn test_pair_uniform_options() {
        let args = InterfaceArgs::new()
            .with_shared("units", "cgs")
            .pair(3)
            .unwrap();

        assert_eq!(args.len(), 3);
        assert!(args.iter().all(|a| a.option("units") == Some("cgs")));
        assert!(args.iter().all(|a| a.catalog.is_none()));
    }

    #[test]
    fn test_pair_per_member_overrides_shared() {
        let args = InterfaceArgs::new()
            .with_shared("chunks", "auto")
            .with_per_member("chunks", ["1", "2"])
            .with_catalogs(["groups_000", "groups_001"])
            .pair(2)
            .unwrap();

        assert_eq!(args[0].option("chunks"), Some("1"));
        assert_eq!(args[1].option("chunks"), Some("2"));
        assert_eq!(args[1].catalog, Some(PathBuf::from("groups_001")));
    }

    #[test]
    fn test_pair_catalog_length_mismatch() {
        let err = InterfaceArgs::new()
            .with_catalogs(["groups_000"])
            .pair(2)
            .unwrap_err();

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
    fn test_pair_option_length_mismatch() {
        let err = InterfaceArgs::new()
            .with_per_member("fields", ["a", "b", "c"])
            .pair(2)
            .unwrap_err();

        assert!(matches!(err, SeriesError::InconsistentSeriesLayout { found: 3, .. }));
    }

    #[test]
    fn test_reader_args_builder() {
        let args = ReaderArgs::new()
            .with_catalog("/run/output/groups_010")
            .with_option("virtual", "true");

        assert_eq!(args.catalog.as_deref(), Some(Path::new("/run/output/groups_010")));
        assert_eq!(args.option("virtual"), Some("true"));
        assert_eq!(args.option("missing"), None);
    }
}
