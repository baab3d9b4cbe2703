//! simseries CLI - Command-line interface
//!
//! Inspects simulation run directories and maintains the series metadata
//! cache.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use simseries::SeriesConfig;
use tracing_subscriber::EnvFilter;

use commands::cache::CacheAction;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "simseries", version, about = "Simulation snapshot series tools")]
struct Cli {
    /// Configuration file (defaults to the user configuration file)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the series metadata cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Report which series type recognizes a directory
    Classify {
        /// Simulation run directory
        path: PathBuf,
    },
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<SeriesConfig, CliError> {
    let config = match path {
        Some(path) => SeriesConfig::load(path)?.with_env_overrides(),
        None => SeriesConfig::load_default()?,
    };
    tracing::debug!(cache_dir = %config.cache_dir.display(), "Loaded configuration");
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Cache { action } => commands::cache::run(action, &config),
        Commands::Classify { path } => commands::classify::run(&path),
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "simseries",
            "cache",
            "list",
            "--config",
            "/etc/simseries.ini",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/simseries.ini")));
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::List
            }
        ));
    }

    #[test]
    fn test_parse_classify() {
        let cli = Cli::try_parse_from(["simseries", "classify", "/data/run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Classify { path } if path == PathBuf::from("/data/run")
        ));
    }

    #[test]
    fn test_load_explicit_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[cache]\nenabled = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(!config.cache_enabled);
    }

    #[test]
    fn test_load_missing_config_fails() {
        let err = load_config(Some(&PathBuf::from("/nonexistent/simseries.ini"))).unwrap_err();
        assert!(matches!(err, CliError::Series(_)));
    }
}
