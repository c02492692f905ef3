//! Application configuration management.
//!
//! Configuration covers the remote provider endpoints, the cache directory,
//! the byte budgets of the two store tiers, and the request timeout.
//!
//! Configuration is stored at `~/.config/convertd/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "convertd";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds.
/// 10s fails fast enough that the retry/fallback path stays responsive.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Primary store tier budget. Small on purpose: overflow exercises the
/// secondary tier instead of growing unbounded.
const PRIMARY_CAPACITY_BYTES: u64 = 4 * 1024 * 1024;

/// Secondary store tier budget.
const SECONDARY_CAPACITY_BYTES: u64 = 48 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rate_provider_url: String,
    pub time_provider_url: String,
    pub cache_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub primary_capacity_bytes: u64,
    pub secondary_capacity_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_provider_url: "https://api.frankfurter.app".to_string(),
            time_provider_url: "https://worldtimeapi.org/api".to_string(),
            cache_dir: None,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            primary_capacity_bytes: PRIMARY_CAPACITY_BYTES,
            secondary_capacity_bytes: SECONDARY_CAPACITY_BYTES,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConvertError::Storage(format!("read config: {}", e)))?;
            serde_json::from_str(&contents)
                .map_err(|e| ConvertError::Corruption(format!("parse config: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConvertError::Storage(format!("create config dir: {}", e)))?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConvertError::Unknown(format!("serialize config: {}", e)))?;
        std::fs::write(path, contents)
            .map_err(|e| ConvertError::Storage(format!("write config: {}", e)))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConvertError::Storage("could not find config directory".to_string()))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Cache directory for the persistent store tiers.
    /// Defaults to the platform cache dir; overridable for tests.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| ConvertError::Storage("could not find cache directory".to_string()))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
