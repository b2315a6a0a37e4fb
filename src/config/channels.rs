//! Notification channel configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::duration;

/// Configured channels, grouped by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channels {
    #[serde(default)]
    pub log: Vec<LogChannelConfig>,
    #[serde(default)]
    pub webhook: Vec<WebhookChannelConfig>,
    #[serde(default)]
    pub slack: Vec<SlackChannelConfig>,
    #[serde(default)]
    pub telegram: Vec<TelegramChannelConfig>,
    #[serde(default)]
    pub syslog: Vec<SyslogChannelConfig>,
}

impl Channels {
    /// Every configured channel name, in kind order
    pub fn names(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.webhook.iter().map(|c| c.name.as_str()))
            .chain(self.slack.iter().map(|c| c.name.as_str()))
            .chain(self.telegram.iter().map(|c| c.name.as_str()))
            .chain(self.syslog.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.len()
            + self.webhook.len()
            + self.slack.len()
            + self.telegram.len()
            + self.syslog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn apply_default_timeout(&mut self, timeout: Duration) {
        let slots = self
            .webhook
            .iter_mut()
            .map(|c| &mut c.timeout)
            .chain(self.slack.iter_mut().map(|c| &mut c.timeout))
            .chain(self.telegram.iter_mut().map(|c| &mut c.timeout))
            .chain(self.syslog.iter_mut().map(|c| &mut c.timeout));

        for slot in slots {
            if slot.is_zero() {
                *slot = timeout;
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        for c in &self.webhook {
            if c.url.trim().is_empty() {
                return Err(format!("webhook channel '{}' has no url", c.name));
            }
        }
        for c in &self.slack {
            if c.token.trim().is_empty() {
                return Err(format!("slack channel '{}' has no token", c.name));
            }
            if c.channel.trim().is_empty() {
                return Err(format!("slack channel '{}' has no target channel", c.name));
            }
        }
        for c in &self.telegram {
            if c.token.trim().is_empty() {
                return Err(format!("telegram channel '{}' has no token", c.name));
            }
        }
        for c in &self.syslog {
            if c.address.trim().is_empty() {
                return Err(format!("syslog channel '{}' has no address", c.name));
            }
            if c.facility > 23 {
                return Err(format!(
                    "syslog channel '{}' has invalid facility {}",
                    c.name, c.facility
                ));
            }
        }
        Ok(())
    }
}

/// Writes alerts to the process log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogChannelConfig {
    pub name: String,
}

/// Generic JSON webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Zero means the global default
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackChannelConfig {
    pub name: String,
    pub token: String,
    pub channel: String,
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    pub name: String,
    pub token: String,
    pub chat_id: i64,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogNetwork {
    #[default]
    Udp,
    Tcp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyslogChannelConfig {
    pub name: String,
    #[serde(default)]
    pub network: SyslogNetwork,
    #[serde(default = "default_syslog_address")]
    pub address: String,
    #[serde(default = "default_syslog_tag")]
    pub tag: String,
    /// RFC 5424 facility code, 0..=23
    #[serde(default = "default_syslog_facility")]
    pub facility: u8,
    /// Bounds connect and write; zero means the global default
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_syslog_address() -> String {
    "127.0.0.1:514".to_string()
}

fn default_syslog_tag() -> String {
    "lookout".to_string()
}

fn default_syslog_facility() -> u8 {
    // user-level messages
    1
}
