//! Dataset type dispatch.
//!
//! Series that discover their own members (see [`crate::arepo`]) ask a
//! [`TypeDispatch`] which reader can open the first member. Only the first
//! candidate is used by the series layer; the full ordered list is returned
//! for other callers that need tie-breaking.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SeriesError};
use crate::reader::DatasetType;

/// Outcome of type dispatch for one path.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Name of the detected format.
    pub format: String,

    /// Reader types able to open the path, most preferred first.
    pub candidates: Vec<Arc<dyn DatasetType>>,
}

impl Dispatch {
    /// The preferred reader type, `None` for an empty candidate list.
    pub fn primary(&self) -> Option<&Arc<dyn DatasetType>> {
        self.candidates.first()
    }
}

/// Chooses reader types for paths.
pub trait TypeDispatch: Send + Sync {
    /// Determine the format of `path` and the readers able to open it.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::UnknownFormat`] when no reader accepts the path.
    fn determine_type(&self, path: &Path) -> Result<Dispatch>;
}

/// Registration table of dataset types, probed in registration order.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<Vec<Arc<dyn DatasetType>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset type.
    ///
    /// A type with the same name replaces the earlier registration in place.
    pub fn register(&self, dataset_type: Arc<dyn DatasetType>) {
        let mut types = self.types.write();
        if let Some(slot) = types.iter_mut().find(|t| t.name() == dataset_type.name()) {
            *slot = dataset_type;
        } else {
            types.push(dataset_type);
        }
    }

    /// Builder-style registration.
    pub fn with(self, dataset_type: Arc<dyn DatasetType>) -> Self {
        self.register(dataset_type);
        self
    }

    /// Names of registered types in probe order.
    pub fn names(&self) -> Vec<String> {
        self.types.read().iter().map(|t| t.name().to_string()).collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl TypeDispatch for TypeRegistry {
    fn determine_type(&self, path: &Path) -> Result<Dispatch> {
        let candidates: Vec<Arc<dyn DatasetType>> = self
            .types
            .read()
            .iter()
            .filter(|t| t.probe(path))
            .cloned()
            .collect();

        let Some(first) = candidates.first() else {
            return Err(SeriesError::UnknownFormat(path.to_path_buf()));
        };

        let format = first.name().to_string();
        tracing::debug!(
            path = %path.display(),
            format = %format,
            candidates = candidates.len(),
            "Determined dataset type"
        );

        Ok(Dispatch { format, candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::reader::{Dataset, ReaderArgs};

    struct SuffixType {
        name: &'static str,
        suffix: &'static str,
    }

    impl DatasetType for SuffixType {
        fn name(&self) -> &str {
            self.name
        }

        fn probe(&self, path: &Path) -> bool {
            path.to_string_lossy().ends_with(self.suffix)
        }

        fn open(
            &self,
            _path: &Path,
            _args: &ReaderArgs,
        ) -> std::result::Result<Box<dyn Dataset>, ReaderError> {
            Err("not used".into())
        }
    }

    fn suffix(name: &'static str, suffix: &'static str) -> Arc<dyn DatasetType> {
        Arc::new(SuffixType { name, suffix })
    }

    #[test]
    fn test_candidates_in_registration_order() {
        let registry = TypeRegistry::new()
            .with(suffix("gadget", ".hdf5"))
            .with(suffix("swift", ".hdf5"))
            .with(suffix("fits", ".fits"));

        let dispatch = registry.determine_type(Path::new("snap_000.hdf5")).unwrap();

        assert_eq!(dispatch.format, "gadget");
        assert_eq!(dispatch.candidates.len(), 2);
        assert_eq!(dispatch.primary().unwrap().name(), "gadget");
        assert_eq!(dispatch.candidates[1].name(), "swift");
    }

    #[test]
    fn test_unknown_format() {
        let registry = TypeRegistry::new().with(suffix("fits", ".fits"));

        let err = registry.determine_type(Path::new("snap_000.hdf5")).unwrap_err();
        assert!(matches!(err, SeriesError::UnknownFormat(_)));
    }

    #[test]
    fn test_register_same_name_replaces_in_place() {
        let registry = TypeRegistry::new()
            .with(suffix("gadget", ".hdf5"))
            .with(suffix("fits", ".fits"))
            .with(suffix("gadget", ".h5"));

        assert_eq!(registry.names(), vec!["gadget", "fits"]);
        assert!(registry.determine_type(Path::new("snap.hdf5")).is_err());
        assert!(registry.determine_type(Path::new("snap.h5")).is_ok());
    }
}
