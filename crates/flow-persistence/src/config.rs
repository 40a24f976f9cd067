//! Client configuration storage
//!
//! Handles persistent storage of the backend connection settings, with
//! environment variable overrides applied on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{defaults, env};

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the workflow API, e.g. `https://api.example.com/v1`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Owner recorded on newly created workflows
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Per-request timeout; unset leaves timeouts to the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// When set, workflows are kept in this directory instead of a server
    #[serde(default)]
    pub local_store_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    defaults::API_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            owner_id: None,
            request_timeout_secs: None,
            local_store_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from disk
    ///
    /// A missing file yields the defaults.
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(defaults::CONFIG_FILE);

        if !fs::try_exists(&config_path).await? {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        let config: Self = serde_json::from_str(&contents).map_err(ConfigError::Parse)?;
        if config.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "requestTimeoutSecs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(config)
    }

    /// Load from disk, then apply the process environment
    pub async fn load_with_env(config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(config_dir).await?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await?;

        let config_path = config_dir.join(defaults::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Override fields from variables found by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env::API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(owner) = lookup(env::OWNER_ID) {
            self.owner_id = Some(owner).filter(|o| !o.trim().is_empty());
        }
        if let Some(raw) = lookup(env::REQUEST_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: env::REQUEST_TIMEOUT_SECS.to_string(),
                    value: raw.clone(),
                })?;
            self.request_timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
