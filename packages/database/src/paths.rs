//! Location of the `SQLite` database file.

use std::path::{Path, PathBuf};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "HERITAGE_DB_PATH";

/// Database location used when [`DB_PATH_ENV`] is unset.
pub const DEFAULT_DB_PATH: &str = "data/heritage.db";

/// Returns the configured database path.
#[must_use]
pub fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
