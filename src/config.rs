use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::Durability;
use crate::store::StoreOptions;
use crate::Result;

/// File name of the database inside the configured data directory.
pub const DB_FILE_NAME: &str = "overlay.redb";

/// Settings for [`crate::DbService`].
///
/// Every field has a default, so a partial JSON file is valid. The default
/// `data_dir` is empty and must be set before the service starts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    /// Ask the engine to flush to stable storage on every commit.
    pub sync_commits: bool,
    pub log_target: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            sync_commits: false,
            log_target: "db".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self { data_dir: data_dir.into(), ..Self::default() }
    }

    /// Loads settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn store_options(&self) -> StoreOptions {
        let durability = if self.sync_commits { Durability::Sync } else { Durability::Async };
        StoreOptions::new().durability(durability).log_target(self.log_target.clone())
    }
}
