//! Engine configuration.
//!
//! Stored as JSON. Every field is optional on disk; a missing file yields
//! the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::normalize_text_option;

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Database file used when no path is given on the command line
    pub database_path: Option<PathBuf>,
    /// Tracing directive applied when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    pub import: ImportConfig,
}

/// Batch import behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportConfig {
    /// Stop a batch at the first failing record instead of counting it
    pub fail_fast: bool,
}

impl EngineConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw)?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    fn normalize(&mut self) {
        self.log_filter = normalize_text_option(self.log_filter.take());
        self.database_path = self
            .database_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}
