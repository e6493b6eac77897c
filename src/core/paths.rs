// src/core/paths.rs

use crate::constants::{APP_DIR, CATALOG_ENV_VAR, CATALOG_FILENAME};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not expand path '{path}': {message}")]
    Expansion { path: String, message: String },
    #[error("Could not make '{path}' absolute: {message}")]
    Absolute { path: PathBuf, message: String },
}

/// Returns the launchpad configuration directory (`~/.config/launchpad`).
/// Nothing is created on disk.
pub fn config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Picks the catalog file: an explicit path wins, then `LAUNCHPAD_CATALOG`,
/// then `catalog.toml` in the config directory.
pub fn catalog_path(explicit: Option<&Path>) -> Result<PathBuf, PathError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match env::var_os(CATALOG_ENV_VAR) {
        Some(value) if !value.is_empty() => {
            log::debug!("Catalog path taken from ${}", CATALOG_ENV_VAR);
            Ok(PathBuf::from(value))
        }
        _ => config_dir().map(|dir| dir.join(CATALOG_FILENAME)),
    }
}

/// Expands `~` and environment variables in `raw`, then anchors a relative
/// result at `root`. The result is absolute even when `root` is relative.
pub fn expand_path(raw: &str, root: &Path) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(raw).map_err(|e| PathError::Expansion {
        path: raw.to_string(),
        message: e.to_string(),
    })?;
    let path = PathBuf::from(expanded.into_owned());
    if path.is_absolute() {
        return Ok(dunce::simplified(&path).to_path_buf());
    }
    let anchored = root.join(path);
    let absolute = std::path::absolute(&anchored).map_err(|e| PathError::Absolute {
        path: anchored.clone(),
        message: e.to_string(),
    })?;
    Ok(dunce::simplified(&absolute).to_path_buf())
}
