//! Notification message

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::Level;

/// Channel-specific options attached to a message (e.g. `fields`, `image`)
pub type MessageOptions = BTreeMap<String, serde_json::Value>;

/// Payload handed to a channel for one alert transition
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub level: Level,
    pub alert_name: String,
    pub text: String,
    pub options: MessageOptions,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        level: Level,
        alert_name: impl Into<String>,
        text: impl Into<String>,
        options: MessageOptions,
    ) -> Self {
        Self {
            level,
            alert_name: alert_name.into(),
            text: text.into(),
            options,
            timestamp: Utc::now(),
        }
    }

    /// `fields` option as display pairs, in key order
    pub fn fields(&self) -> Vec<(String, String)> {
        match self.options.get("fields") {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `image` option, if it is a string
    pub fn image(&self) -> Option<&str> {
        self.options.get("image").and_then(|v| v.as_str())
    }

    /// One-line rendering used by text based channels
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.level.as_str().to_uppercase(),
            self.alert_name,
            self.text
        )
    }

    /// Summary followed by one `key: value` line per field
    pub fn render_text(&self) -> String {
        let mut out = self.summary();
        for (key, value) in self.fields() {
            out.push('\n');
            out.push_str(&key);
            out.push_str(": ");
            out.push_str(&value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_and_image() {
        let mut options = MessageOptions::new();
        options.insert("fields".into(), json!({"host": "db1", "p99": 250}));
        options.insert("image".into(), json!("https://example.com/graph.png"));

        let message = Message::new(Level::Warning, "db-latency", "slow", options);

        assert_eq!(
            message.fields(),
            vec![
                ("host".to_string(), "db1".to_string()),
                ("p99".to_string(), "250".to_string())
            ]
        );
        assert_eq!(message.image(), Some("https://example.com/graph.png"));
        assert_eq!(
            message.render_text(),
            "[WARNING] db-latency: slow\nhost: db1\np99: 250"
        );
    }

    #[test]
    fn test_no_options() {
        let message = Message::new(Level::Error, "disk", "full", MessageOptions::new());
        assert!(message.fields().is_empty());
        assert_eq!(message.image(), None);
        assert_eq!(message.summary(), "[ERROR] disk: full");
    }
}
