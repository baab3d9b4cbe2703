//! Configuration for series construction.
//!
//! Settings come from built-in defaults, optionally an INI file, and
//! finally the environment:
//!
//! ```ini
//! [cache]
//! directory = ~/.cache/simseries
//! enabled = true
//!
//! [series]
//! parallel_open = true
//! ```
//!
//! `SIMSERIES_CACHE_DIR` overrides the cache directory.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::{Result, SeriesError};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "SIMSERIES_CACHE_DIR";

/// Configuration for series construction and the metadata cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesConfig {
    /// Root directory of the metadata cache.
    pub cache_dir: PathBuf,

    /// Whether metadata is looked up in and stored to the cache.
    pub cache_enabled: bool,

    /// Whether members are opened in parallel when metadata must be
    /// computed.
    pub parallel_open: bool,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_enabled: true,
            parallel_open: true,
        }
    }
}

impl SeriesConfig {
    /// Configuration with the given cache directory and defaults otherwise.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Enable or disable the metadata cache.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Enable or disable parallel member construction.
    pub fn with_parallel_open(mut self, parallel: bool) -> Self {
        self.parallel_open = parallel;
        self
    }

    /// Parse settings from INI text on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Config`] for malformed INI or values.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| SeriesError::Config(e.to_string()))?;
        Self::default().apply_ini(&ini)
    }

    /// Load settings from an INI file on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| SeriesError::Config(format!("{}: {}", path.display(), e)))?;
        Self::default().apply_ini(&ini)
    }

    /// Load the user configuration file if present, then apply the
    /// environment.
    pub fn load_default() -> Result<Self> {
        let config = match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => self.with_cache_dir(PathBuf::from(dir)),
            _ => self,
        }
    }

    fn apply_ini(mut self, ini: &Ini) -> Result<Self> {
        if let Some(cache) = ini.section(Some("cache")) {
            if let Some(dir) = cache.get("directory") {
                self.cache_dir = expand_tilde(dir);
            }
            if let Some(enabled) = cache.get("enabled") {
                self.cache_enabled = parse_bool("cache.enabled", enabled)?;
            }
        }

        if let Some(series) = ini.section(Some("series")) {
            if let Some(parallel) = series.get("parallel_open") {
                self.parallel_open = parse_bool("series.parallel_open", parallel)?;
            }
        }

        Ok(self)
    }
}

/// Default cache root: the platform cache directory, or the temp directory
/// when none is known.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("simseries"))
        .unwrap_or_else(|| std::env::temp_dir().join("simseries-cache"))
}

/// Default location of the user configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("simseries").join("config.ini"))
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(SeriesError::Config(format!(
            "invalid boolean for {}: '{}'",
            key, other
        ))),
    }
}
