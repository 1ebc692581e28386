//! Configuration management for stackctl.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `stackctl.toml` file
//! 3. User config `~/.config/stackctl/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stack management API configuration.
    pub api: ApiConfig,

    /// Task poller configuration.
    pub poller: PollerConfig,

    /// Backup view configuration.
    pub backup: BackupConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./stackctl.toml` (project local)
    /// 2. `~/.config/stackctl/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Location of the per-user config file, if a config dir exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join("config.toml"))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("STACKCTL_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("STACKCTL_API_TOKEN") {
            self.api.token = Some(token);
        }
        if let Ok(interval) = std::env::var("STACKCTL_POLL_INTERVAL_MS") {
            if let Ok(n) = interval.parse() {
                self.poller.interval_ms = n;
            }
        }
        if let Ok(stack) = std::env::var("STACKCTL_STACK_ID") {
            self.backup.stack_id = Some(stack);
        }
    }

    /// Rejects values the poller and store cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::Invalid("poller.interval_ms must be positive".into()));
        }
        if self.poller.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid(
                "poller.max_consecutive_failures must be positive".into(),
            ));
        }
        if self.backup.checkpoint_limit == 0 {
            return Err(ConfigError::Invalid("backup.checkpoint_limit must be positive".into()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Stack management API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://ops.example.com/api/v1`.
    pub base_url: String,

    /// Bearer token (can also be set via `STACKCTL_API_TOKEN`).
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Timeout for operation submissions, in seconds.
    pub submit_timeout_secs: u64,

    /// Timeout for status and checkpoint reads, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for a single task poll, in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            submit_timeout_secs: DEFAULT_SUBMIT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Task poller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Fixed delay between status requests, in milliseconds.
    pub interval_ms: u64,

    /// Transport failures in a row before the poll is reported as failed.
    pub max_consecutive_failures: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Backup view configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Stack used when none is given on the command line.
    pub stack_id: Option<String>,

    /// How many checkpoints to fetch (most recent first).
    pub checkpoint_limit: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            stack_id: None,
            checkpoint_limit: DEFAULT_CHECKPOINT_LIMIT,
        }
    }
}
