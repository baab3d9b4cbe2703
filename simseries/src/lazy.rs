//! Deferred construction of member datasets.
//!
//! Opening a snapshot can mean parsing headers of hundreds of files, so a
//! series whose metadata is already cached keeps its members unopened until
//! something actually needs them. A [`Member`] is either holding the
//! arguments it will be opened with or the opened dataset; the first call to
//! [`Member::dataset`] performs the transition exactly once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, SeriesError};
use crate::metadata::MemberMetadata;
use crate::reader::{Dataset, DatasetType, ReaderArgs};

enum MemberState {
    Unloaded(ReaderArgs),
    Loaded(Arc<dyn Dataset>),
}

/// One member of a series, opened now or on first use.
pub struct Member {
    path: PathBuf,
    dataset_type: Arc<dyn DatasetType>,
    state: Mutex<MemberState>,
}

impl Member {
    /// A member that is opened on first access.
    pub fn lazy(path: PathBuf, dataset_type: Arc<dyn DatasetType>, args: ReaderArgs) -> Self {
        Self {
            path,
            dataset_type,
            state: Mutex::new(MemberState::Unloaded(args)),
        }
    }

    /// Open a member immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Reader`] carrying the reader's error.
    pub fn open(
        path: PathBuf,
        dataset_type: Arc<dyn DatasetType>,
        args: &ReaderArgs,
    ) -> Result<Self> {
        let dataset = construct(&path, dataset_type.as_ref(), args)?;
        Ok(Self::loaded(path, dataset_type, dataset))
    }

    /// Wrap an already opened dataset.
    pub fn loaded(
        path: PathBuf,
        dataset_type: Arc<dyn DatasetType>,
        dataset: Arc<dyn Dataset>,
    ) -> Self {
        Self {
            path,
            dataset_type,
            state: Mutex::new(MemberState::Loaded(dataset)),
        }
    }

    /// Path of this member. Never triggers I/O.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reader type used to open this member.
    pub fn dataset_type(&self) -> &Arc<dyn DatasetType> {
        &self.dataset_type
    }

    /// Whether the dataset has been opened.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), MemberState::Loaded(_))
    }

    /// The opened dataset, opening it on first call.
    ///
    /// The member lock is held while opening, so concurrent callers wait
    /// for a single construction. If opening fails the member stays
    /// unloaded and a later call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Reader`] carrying the reader's error.
    pub fn dataset(&self) -> Result<Arc<dyn Dataset>> {
        let mut state = self.state.lock();

        let dataset = match &*state {
            MemberState::Loaded(dataset) => return Ok(Arc::clone(dataset)),
            MemberState::Unloaded(args) => {
                tracing::debug!(path = %self.path.display(), "Opening deferred member");
                construct(&self.path, self.dataset_type.as_ref(), args)?
            }
        };

        *state = MemberState::Loaded(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Metadata of the member, opening it if necessary.
    pub fn metadata(&self) -> Result<MemberMetadata> {
        Ok(self.dataset()?.metadata())
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("path", &self.path)
            .field("dataset_type", &self.dataset_type.name())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn construct(
    path: &Path,
    dataset_type: &dyn DatasetType,
    args: &ReaderArgs,
) -> Result<Arc<dyn Dataset>> {
    dataset_type
        .open(path, args)
        .map(Arc::from)
        .map_err(|source| SeriesError::Reader {
            path: path.to_path_buf(),
            source,
        })
}
