//! Test fixtures shared by unit tests.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ReaderError;
use crate::metadata::MemberMetadata;
use crate::reader::{Dataset, DatasetType, ReaderArgs};

/// Name of the header file inside a directory-shaped member.
pub(crate) const HEADER_FILE: &str = "header.json";

/// A dataset whose header is a JSON object of scalar fields, stored either
/// as the member file itself or as [`HEADER_FILE`] inside a member
/// directory.
pub(crate) struct JsonHeader {
    path: PathBuf,
    header: MemberMetadata,
    pub(crate) catalog: Option<PathBuf>,
}

impl Dataset for JsonHeader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> MemberMetadata {
        self.header.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reader for [`JsonHeader`] files that counts how often it opens one.
#[derive(Default)]
pub(crate) struct JsonHeaderType {
    opened: AtomicUsize,
}

impl JsonHeaderType {
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl DatasetType for JsonHeaderType {
    fn name(&self) -> &str {
        "json-header"
    }

    fn probe(&self, path: &Path) -> bool {
        path.extension().map_or(false, |ext| ext == "json") || path.join(HEADER_FILE).is_file()
    }

    fn open(&self, path: &Path, args: &ReaderArgs) -> Result<Box<dyn Dataset>, ReaderError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let header_path = if path.is_dir() {
            path.join(HEADER_FILE)
        } else {
            path.to_path_buf()
        };
        let text = std::fs::read_to_string(header_path)?;
        let header: MemberMetadata = serde_json::from_str(&text)?;
        Ok(Box::new(JsonHeader {
            path: path.to_path_buf(),
            header,
            catalog: args.catalog.clone(),
        }))
    }
}

/// Write a member file and return its path.
pub(crate) fn write_member(dir: &Path, name: &str, header: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, header).unwrap();
    path
}
