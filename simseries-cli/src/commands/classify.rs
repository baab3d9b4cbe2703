//! Directory classification command.

use std::path::Path;

use simseries::{
    classify_series, register_builtin_series_types, registered_series_types, SeriesError,
};

use crate::error::CliError;

/// Print the name of the series type that recognizes `path`.
pub fn run(path: &Path) -> Result<(), CliError> {
    let kind = classify(path)?;
    println!("{}: {}", path.display(), kind);
    Ok(())
}

fn classify(path: &Path) -> Result<String, CliError> {
    if !path.exists() {
        return Err(SeriesError::InvalidPath(path.to_path_buf()).into());
    }

    register_builtin_series_types();
    tracing::debug!(types = ?registered_series_types(), "Classifying directory");

    classify_series(path)
        .map(|kind| kind.name().to_string())
        .ok_or_else(|| CliError::Unrecognized(path.to_path_buf()))
}
