//! Runtime configuration shared by the library and the command line.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DatasetError, DatasetResult};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_TILE_URL_BASE: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,
    /// How long a writer waits on a locked database before giving up
    pub busy_timeout: Duration,
    /// Public base URL used in map layer descriptors
    pub tile_url_base: String,
}

impl Config {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            tile_url_base: DEFAULT_TILE_URL_BASE.to_string(),
        }
    }

    /// Config pointing at the per-user data directory
    pub fn from_project_dirs() -> DatasetResult<Self> {
        Ok(Self::new(default_database_path()?))
    }

    pub fn with_busy_timeout(self, busy_timeout: Duration) -> Self {
        Self { busy_timeout, ..self }
    }

    pub fn with_tile_url_base(self, tile_url_base: impl Into<String>) -> Self {
        Self {
            tile_url_base: tile_url_base.into(),
            ..self
        }
    }
}

/// `<data dir>/geodata.sqlite`, creating the directory if needed
pub fn default_database_path() -> DatasetResult<PathBuf> {
    let dirs = ProjectDirs::from("", "", "geodata")
        .ok_or_else(|| DatasetError::internal("could not determine data directory"))?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| {
        DatasetError::internal(format!("failed to create {}: {}", data_dir.display(), e))
    })?;
    Ok(data_dir.join("geodata.sqlite"))
}
