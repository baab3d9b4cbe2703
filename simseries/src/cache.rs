//! On-disk cache of aggregated series metadata.
//!
//! Building a series from scratch opens every member to read its metadata.
//! The result is stored under a directory named by the series hash so that a
//! later series over the same paths can skip opening members entirely.
//!
//! # Layout
//!
//! ```text
//! <cache root>/
//! ├── 3f2a…e1/
//! │   └── data.json     # {"0": {"redshift": 2.0, ...}, "1": {...}, ...}
//! └── 9b07…4c/
//!     └── data.json
//! ```
//!
//! Entries are written once and never overwritten. Nothing invalidates an
//! entry automatically; the same hash always reads the same file. Reading is
//! best-effort: a missing, unreadable or malformed entry is a miss.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::config::SeriesConfig;
use crate::error::CacheError;
use crate::metadata::{MetadataValue, SeriesMetadata};

/// File name of a cache entry inside its hash directory.
pub const CACHE_FILE_NAME: &str = "data.json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Compute the identity hash of a series.
///
/// The hash is the lowercase hex SHA-256 of the member path strings
/// concatenated in order, so it changes with both the paths and their order.
pub fn series_hash<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut hasher = Sha256::new();
    for path in paths {
        hasher.update(path.as_ref().to_string_lossy().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Summary of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    /// Series hash naming the entry.
    pub hash: String,

    /// Path of the entry's `data.json`.
    pub path: PathBuf,

    /// Number of members described, `None` if the entry is unreadable.
    pub members: Option<usize>,

    /// Size of the entry file in bytes.
    pub size_bytes: u64,
}

/// Result of clearing the cache.
#[derive(Debug, Clone, Default)]
pub struct ClearResult {
    /// Number of entries removed.
    pub entries_removed: usize,

    /// Total bytes freed.
    pub bytes_freed: u64,
}

/// Handle on the metadata cache directory.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    root: PathBuf,
    enabled: bool,
}

impl MetadataCache {
    /// Cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: true,
        }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            root: PathBuf::new(),
            enabled: false,
        }
    }

    /// Cache described by the configuration.
    pub fn from_config(config: &SeriesConfig) -> Self {
        if config.cache_enabled {
            Self::new(&config.cache_dir)
        } else {
            Self::disabled()
        }
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether lookups and stores are performed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve a path relative to the cache root.
    pub fn cache_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Location of the entry for `hash`.
    pub fn entry_path(&self, hash: &str) -> PathBuf {
        self.cache_path(Path::new(hash).join(CACHE_FILE_NAME))
    }

    /// Whether an entry file exists for `hash`.
    pub fn contains(&self, hash: &str) -> bool {
        self.enabled && self.entry_path(hash).is_file()
    }

    /// Read the entry for `hash`, reporting why it could not be used.
    ///
    /// Returns `Ok(None)` when no entry exists.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Io`] if the file exists but cannot be read
    /// - [`CacheError::Serialization`] if it is not a metadata mapping
    /// - [`CacheError::Layout`] if its member keys are not `0..N-1`
    pub fn read(&self, hash: &str) -> Result<Option<SeriesMetadata>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.entry_path(hash);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };

        let metadata: SeriesMetadata = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CacheError::Serialization {
                path: path.clone(),
                source,
            })?;

        if !metadata.is_contiguous() {
            return Err(CacheError::Layout { path });
        }

        Ok(Some(metadata))
    }

    /// Look up cached metadata for `hash`.
    ///
    /// Any failure to read the entry is logged and treated as a miss.
    pub fn load_cached(&self, hash: &str) -> Option<SeriesMetadata> {
        match self.read(hash) {
            Ok(Some(metadata)) => {
                tracing::debug!(hash, members = metadata.len(), "Metadata cache hit");
                Some(metadata)
            }
            Ok(None) => {
                tracing::debug!(hash, "Metadata cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(hash, error = %e, "Ignoring unusable metadata cache entry");
                None
            }
        }
    }

    /// Persist metadata for `hash` unless an entry already exists.
    ///
    /// The JSON is written to a temporary sibling and hard-linked into
    /// place, so readers never observe a partial file and a concurrent
    /// writer that lost the race leaves the existing entry untouched.
    ///
    /// Returns `true` if this call created the entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the entry could not be written, or
    /// [`CacheError::NonFinite`] if a float is NaN or infinite.
    pub fn store_cached(&self, hash: &str, metadata: &SeriesMetadata) -> Result<bool, CacheError> {
        if !self.enabled {
            return Ok(false);
        }

        check_finite(metadata)?;

        let path = self.entry_path(hash);
        if path.exists() {
            tracing::debug!(hash, "Metadata cache entry already present, not overwriting");
            return Ok(false);
        }

        let dir = self.cache_path(hash);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let temp_path = dir.join(format!(
            "{}.{}.{}.tmp",
            CACHE_FILE_NAME,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = write_json(&temp_path, metadata).and_then(|()| publish(&temp_path, &path));
        let _ = fs::remove_file(&temp_path);

        let created = written?;
        if created {
            tracing::info!(
                hash,
                path = %path.display(),
                members = metadata.len(),
                "Stored series metadata in cache"
            );
        } else {
            tracing::debug!(hash, "Lost metadata cache write race, keeping existing entry");
        }

        Ok(created)
    }

    /// Remove the entry for `hash`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&self, hash: &str) -> Result<bool, CacheError> {
        let dir = self.cache_path(hash);
        if !self.enabled || !dir.is_dir() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(true)
    }

    /// List all entries, sorted by hash.
    pub fn list(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        if !self.enabled || !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let read_dir = fs::read_dir(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path().join(CACHE_FILE_NAME);
            let Ok(file_meta) = fs::metadata(&path) else {
                continue;
            };

            let hash = entry.file_name().to_string_lossy().to_string();
            let members = self.read(&hash).ok().flatten().map(|m| m.len());

            entries.push(CacheEntryInfo {
                hash,
                path,
                members,
                size_bytes: file_meta.len(),
            });
        }

        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(entries)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<ClearResult, CacheError> {
        let mut result = ClearResult::default();

        for entry in self.list()? {
            if self.remove(&entry.hash)? {
                result.entries_removed += 1;
                result.bytes_freed += entry.size_bytes;
            }
        }

        tracing::info!(
            entries = result.entries_removed,
            bytes = result.bytes_freed,
            "Cleared metadata cache"
        );

        Ok(result)
    }
}

fn write_json(path: &Path, metadata: &SeriesMetadata) -> Result<(), CacheError> {
    let file = File::create(path).map_err(|e| CacheError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, metadata).map_err(|source| CacheError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    writer.flush().map_err(|e| CacheError::io(path, e))
}

/// JSON has no encoding for NaN or infinity, so such values would be
/// written as `null` and the entry could never be read back.
fn check_finite(metadata: &SeriesMetadata) -> Result<(), CacheError> {
    for (member, fields) in metadata.iter() {
        for (field, value) in fields {
            if let MetadataValue::Float(f) = value {
                if !f.is_finite() {
                    return Err(CacheError::NonFinite {
                        member,
                        field: field.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Move a fully written temporary file to `path` without clobbering.
fn publish(temp_path: &Path, path: &Path) -> Result<bool, CacheError> {
    match fs::hard_link(temp_path, path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            // Filesystems without hard links fall back to check-then-rename.
            tracing::debug!(error = %e, "Hard link failed, falling back to rename");
            if path.exists() {
                return Ok(false);
            }
            fs::rename(temp_path, path).map_err(|e| CacheError::io(path, e))?;
            Ok(true)
        }
    }
}
