//! Configuration loading
//!
//! The whole engine is described by one YAML document:
//!
//! ```yaml
//! global:
//!   api: { host: 0.0.0.0, port: 8080 }
//!   default_timeout: 5s
//! channels:
//!   log:
//!     - name: log
//!   slack:
//!     - { name: ops, token: xoxb-..., channel: "#ops" }
//! datasources:
//!   postgres:
//!     - { name: main, host: db, database: app }
//! ```

mod channels;
mod datasources;
pub mod duration;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub use channels::{
    Channels, LogChannelConfig, SlackChannelConfig, SyslogChannelConfig, SyslogNetwork,
    TelegramChannelConfig, WebhookChannelConfig,
};
pub use datasources::{BasicAuth, DataSources, PostgresConfig, PrometheusConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub channels: Channels,
    #[serde(default)]
    pub datasources: DataSources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    #[serde(default)]
    pub api: ApiConfig,
    /// Applied to every channel and datasource without its own timeout
    #[serde(default = "default_timeout", with = "duration")]
    pub default_timeout: Duration,
}

impl Default for Global {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            default_timeout: default_timeout(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Config {
    /// Read, parse and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(raw)?;

        if config.global.default_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "default_timeout must be greater than zero".to_string(),
            ));
        }

        let timeout = config.global.default_timeout;
        config.channels.apply_default_timeout(timeout);
        config.datasources.apply_default_timeout(timeout);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in self.channels.names() {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "channel with empty name".to_string(),
                ));
            }
            // Unique across all kinds, ignoring case
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate channel name '{}'",
                    name
                )));
            }
        }

        self.channels.validate().map_err(ConfigError::Validation)?;
        self.datasources.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}
