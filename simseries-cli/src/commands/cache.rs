//! Cache management CLI commands.
//!
//! Provides `cache path`, `cache hash`, `cache list`, `cache show`,
//! `cache remove` and `cache clear` for inspecting and pruning the series
//! metadata cache.

use std::path::PathBuf;

use clap::Subcommand;
use simseries::{series_hash, CacheEntryInfo, MetadataCache, SeriesConfig};

use crate::error::CliError;

/// Length of a series hash in hex characters.
const HASH_LEN: usize = 64;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show the cache root directory
    Path,

    /// Print the series hash of member paths, in the order given
    Hash {
        /// Member paths, exactly as they are passed to the library
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List cached series with their member counts
    List,

    /// Print the cached metadata of a series as JSON
    Show {
        /// Series hash
        hash: String,
    },

    /// Remove the cached metadata of a series
    Remove {
        /// Series hash
        hash: String,
    },

    /// Remove all cached series metadata
    Clear,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: &SeriesConfig) -> Result<(), CliError> {
    // Maintenance works on the directory even when lookups are disabled.
    let cache = MetadataCache::new(&config.cache_dir);

    match action {
        CacheAction::Path => {
            println!("{}", cache.root().display());
            Ok(())
        }
        CacheAction::Hash { paths } => {
            println!("{}", series_hash(&paths));
            Ok(())
        }
        CacheAction::List => run_list(&cache),
        CacheAction::Show { hash } => run_show(&cache, &hash),
        CacheAction::Remove { hash } => run_remove(&cache, &hash),
        CacheAction::Clear => run_clear(&cache),
    }
}

fn run_list(cache: &MetadataCache) -> Result<(), CliError> {
    let entries = cache.list()?;

    if entries.is_empty() {
        println!("No cached series in {}", cache.root().display());
        return Ok(());
    }

    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    println!();
    println!("{} series", entries.len());
    Ok(())
}

fn run_show(cache: &MetadataCache, hash: &str) -> Result<(), CliError> {
    validate_hash(hash)?;

    let metadata = cache
        .read(hash)?
        .ok_or_else(|| CliError::EntryNotFound(hash.to_string()))?;
    let json =
        serde_json::to_string_pretty(&metadata).map_err(|e| CliError::Output(e.to_string()))?;

    println!("{}", json);
    Ok(())
}

fn run_remove(cache: &MetadataCache, hash: &str) -> Result<(), CliError> {
    validate_hash(hash)?;

    if !cache.remove(hash)? {
        return Err(CliError::EntryNotFound(hash.to_string()));
    }
    println!("Removed cached series {}", hash);
    Ok(())
}

fn run_clear(cache: &MetadataCache) -> Result<(), CliError> {
    println!("Clearing metadata cache at: {}", cache.root().display());

    let result = cache.clear()?;
    println!(
        "Removed {} series, freed {}",
        result.entries_removed,
        format_size(result.bytes_freed)
    );
    Ok(())
}

/// Reject anything that is not a series hash, so entry paths stay inside
/// the cache root.
fn validate_hash(hash: &str) -> Result<(), CliError> {
    if hash.len() == HASH_LEN && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(CliError::InvalidHash(hash.to_string()))
    }
}

fn format_entry(entry: &CacheEntryInfo) -> String {
    let members = match entry.members {
        Some(n) => format!("{} members", n),
        None => "unreadable".to_string(),
    };
    format!("{}  {:>12}  {:>10}", entry.hash, members, format_size(entry.size_bytes))
}

/// Format a byte count for display.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
