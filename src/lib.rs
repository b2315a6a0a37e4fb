//! Lookout: script-driven alerting
//!
//! Check scripts run on an external schedule, query datasources and report
//! the state of named alerts. Lookout keeps the current level of every
//! alert and notifies channels when a level changes.
//!
//! # Features
//!
//! - **Alert Registry**: Concurrent per-alert state with consecutive counts
//! - **Notification Fan-out**: Log, webhook, Slack, Telegram and syslog channels
//! - **Datasources**: Postgres and Prometheus queries with per-query deadlines
//! - **Script Bridge**: `alert` and `<kind>.<name>` modules for the script runtime
//! - **HTTP API**: Read-only listing of alert state
//!
//! # Example
//!
//! ```no_run
//! use lookout::alert::{AlertRegistry, Level};
//!
//! let registry = AlertRegistry::new();
//!
//! let outcome = registry.report("db.replication_lag", Level::Error).unwrap();
//! assert!(outcome.changed);
//!
//! let outcome = registry.report("db.replication_lag", Level::Error).unwrap();
//! assert_eq!(outcome.alert.count(), 2);
//! ```

pub mod alert;
pub mod api;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod notify;
pub mod script;

// Re-export commonly used types
pub use alert::{Alert, AlertRegistry, Level};
pub use config::{Config, ConfigError};
pub use engine::{Engine, EngineError};
pub use notify::{Channel, Dispatcher};
pub use script::{Script, ScriptEnv, ScriptValue};
