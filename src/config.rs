// SPDX-License-Identifier: Apache-2.0

//! Catalog engine configuration
//!
//! Read from `catalog.json` in the data directory. Every field is optional;
//! a missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::error::{EngineError, EngineResult};
use crate::metadata::retry::RetryPolicy;

pub const CONFIG_FILE_NAME: &str = "catalog.json";
const STORE_FILE_NAME: &str = "catalog.db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Applied to every catalog query an extractor issues
    pub retry: RetryPolicy,
    pub connect_timeout_secs: u64,
    /// `sqlite:` URL of the metadata store; defaults to `catalog.db` in the
    /// data directory
    pub storage_url: Option<String>,
    pub log_retention_days: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            connect_timeout_secs: 15,
            storage_url: None,
            log_retention_days: 14,
        }
    }
}

impl CatalogConfig {
    /// Loads `catalog.json` from `data_dir`, falling back to defaults when
    /// the file does not exist.
    pub fn load(data_dir: &Path) -> EngineResult<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            debug!("No catalog config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| EngineError::validation(format!("Failed to read config: {}", e)))?;
        let config: CatalogConfig = serde_json::from_str(&content)
            .map_err(|e| EngineError::validation(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        info!("Loaded catalog configuration from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> EngineResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(data_dir.join(CONFIG_FILE_NAME), content)
            .map_err(|e| EngineError::storage(format!("Failed to write config: {}", e)))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(EngineError::validation("retry.max_attempts must be at least 1"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(EngineError::validation("connect_timeout_secs must be at least 1"));
        }
        if let Some(url) = &self.storage_url {
            if !url.starts_with("sqlite:") {
                return Err(EngineError::validation(format!(
                    "storage_url must be a sqlite: URL, got {}",
                    url
                )));
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn storage_url(&self, data_dir: &Path) -> String {
        self.storage_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}", data_dir.join(STORE_FILE_NAME).display()))
    }

    pub fn log_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("logs")
    }
}
