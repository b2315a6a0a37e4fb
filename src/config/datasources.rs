//! Datasource configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSources {
    #[serde(default)]
    pub postgres: Vec<PostgresConfig>,
    #[serde(default)]
    pub prometheus: Vec<PrometheusConfig>,
}

impl DataSources {
    pub fn len(&self) -> usize {
        self.postgres.len() + self.prometheus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn apply_default_timeout(&mut self, timeout: Duration) {
        let slots = self
            .postgres
            .iter_mut()
            .map(|c| &mut c.timeout)
            .chain(self.prometheus.iter_mut().map(|c| &mut c.timeout));

        for slot in slots {
            if slot.is_zero() {
                *slot = timeout;
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        unique_names("postgres", self.postgres.iter().map(|c| c.name.as_str()))?;
        unique_names("prometheus", self.prometheus.iter().map(|c| c.name.as_str()))?;

        for c in &self.postgres {
            if c.host.trim().is_empty() {
                return Err(format!("postgres datasource '{}' has no host", c.name));
            }
            if c.database.trim().is_empty() {
                return Err(format!("postgres datasource '{}' has no database", c.name));
            }
            if c.max_connections == 0 {
                return Err(format!(
                    "postgres datasource '{}' needs at least one connection",
                    c.name
                ));
            }
        }
        for c in &self.prometheus {
            if c.url.trim().is_empty() {
                return Err(format!("prometheus datasource '{}' has no url", c.name));
            }
        }
        Ok(())
    }
}

fn unique_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(format!("{} datasource with empty name", kind));
        }
        if !seen.insert(name) {
            return Err(format!("duplicate {} datasource '{}'", kind, name));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
    /// `disable`, `prefer`, `require`, `verify-ca` or `verify-full`
    #[serde(default)]
    pub ssl_mode: Option<String>,
    #[serde(default, with = "duration")]
    pub timeout: Duration,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    pub name: String,
    pub url: String,
    #[serde(default, alias = "basicAuth")]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default, with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}
