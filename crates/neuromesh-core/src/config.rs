//! Configuration management for the NeuroMesh client.
//!
//! The config file lives at a platform-appropriate location:
//! - Linux: `~/.config/neuromesh/config.toml`
//! - macOS: `~/Library/Application Support/neuromesh/config.toml`
//!
//! The file is optional. A missing file means "use the defaults", which
//! point at a backend running on the same machine.
//!
//! # Config File Format (TOML)
//!
//! ```toml
//! base_url = "http://localhost:8080/app"
//! chat_path = "/chat"
//! peers_path = "/peer-conversations"
//! poll_interval_secs = 5      # 5..=10
//! request_timeout_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write config file at {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory for this platform")]
    NoConfigDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Allowed range for the dashboard refresh period, in seconds.
pub const POLL_INTERVAL_RANGE: RangeInclusive<u64> = 5..=10;

/// The persisted configuration for this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL every endpoint hangs off, without a trailing slash.
    pub base_url: String,

    /// Path of the chat endpoint, relative to `base_url`.
    pub chat_path: String,

    /// Path of the peer-conversations endpoint, relative to `base_url`.
    pub peers_path: String,

    /// Seconds between background refreshes of the peer dashboard.
    pub poll_interval_secs: u64,

    /// Upper bound on a single HTTP request. Model replies can be slow.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/app".to_string(),
            chat_path: "/chat".to_string(),
            peers_path: "/peer-conversations".to_string(),
            poll_interval_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Returns the platform-appropriate config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("neuromesh"))
    }

    /// Returns the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("config.toml"))
    }

    /// Returns the platform-appropriate data directory, used for the log file.
    ///
    /// - Linux: `~/.local/share/neuromesh/`
    /// - macOS: `~/Library/Application Support/neuromesh/`
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("neuromesh"))
    }

    /// Loads the config from the default path, falling back to defaults
    /// when no file exists. Not validated; see [`AppConfig::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_file_path()?;
        Ok(Self::load_from(&path)?.unwrap_or_default())
    }

    /// Loads the config from a specific file path.
    ///
    /// Returns `Ok(None)` if the file doesn't exist. Fields missing from
    /// the file take their default values. Value ranges are not checked
    /// here: callers apply their overrides first, then call
    /// [`AppConfig::validate`].
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_owned(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_owned(),
            source: e,
        })?;
        Ok(Some(config))
    }

    /// Saves this config to a specific file path.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
                path: path.to_owned(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteFile {
            path: path.to_owned(),
            source: e,
        })?;
        Ok(())
    }

    /// Checks value ranges that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }
        if !POLL_INTERVAL_RANGE.contains(&self.poll_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_secs must be within {}..={} (got {})",
                POLL_INTERVAL_RANGE.start(),
                POLL_INTERVAL_RANGE.end(),
                self.poll_interval_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    /// Full URL of the peer-conversations endpoint.
    pub fn peers_url(&self) -> String {
        join_url(&self.base_url, &self.peers_path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Joins a base URL and a path with exactly one `/` between them.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
