//! Alert data types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" => Ok(Level::Success),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad level value: {0}")]
pub struct ParseLevelError(pub String);

/// Current state of one named condition
///
/// `count` is the number of consecutive reports confirming `level`;
/// `last_change` moves only when the level does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    name: String,
    level: Level,
    count: u64,
    last_change: DateTime<Utc>,
}

impl Alert {
    pub(crate) fn new(name: impl Into<String>, level: Level) -> Self {
        Self {
            name: name.into(),
            level,
            count: 0,
            last_change: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_change(&self) -> DateTime<Utc> {
        self.last_change
    }

    pub fn has_level(&self, level: Level) -> bool {
        self.level == level
    }

    /// Apply one report. Returns true when the level changed.
    pub(crate) fn apply(&mut self, level: Level, now: DateTime<Utc>) -> bool {
        if self.level == level {
            self.count += 1;
            return false;
        }

        self.level = level;
        self.count = 1;
        self.last_change = now;
        true
    }
}
