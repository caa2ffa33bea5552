//! Path utilities for Memory Keeper directory resolution.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

const MEMKEEPER_DIR: &str = ".memkeeper";
const DB_FILE: &str = "memkeeper.redb";

/// Environment variable to override the Memory Keeper directory.
const MEMKEEPER_DIR_ENV: &str = "MEMKEEPER_DIR";

/// Resolve the Memory Keeper data directory.
/// Priority: MEMKEEPER_DIR env var > ~/.memkeeper/
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(MEMKEEPER_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(MEMKEEPER_DIR))
        .ok_or_else(|| StoreError::Unavailable {
            reason: "failed to determine home directory".to_string(),
        })
}

/// Ensure the data directory exists and return its path.
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = resolve_data_dir()?;
    std::fs::create_dir_all(&dir).map_err(|err| StoreError::Unavailable {
        reason: format!("cannot create {}: {err}", dir.display()),
    })?;
    Ok(dir)
}

/// Database file path inside a data directory.
pub fn db_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join(DB_FILE)
}
