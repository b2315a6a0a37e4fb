//! In-memory alert registry

use std::ops::Deref;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use super::model::{Alert, Level};

/// Result of a single report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    /// Whether the report moved the alert to a different level
    pub changed: bool,
    /// State of the alert right after the report
    pub alert: Alert,
}

/// Checked-out alert
///
/// Holds the alert's exclusive section until released or dropped. Reports
/// to the same name block in the meantime, so never report a name you are
/// holding a reference to.
pub struct AlertRef {
    guard: ArcMutexGuard<RawMutex, Alert>,
}

impl Deref for AlertRef {
    type Target = Alert;

    fn deref(&self) -> &Alert {
        &self.guard
    }
}

impl std::fmt::Debug for AlertRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AlertRef").field(&*self.guard).finish()
    }
}

/// Registry mapping alert names to their state
///
/// The name map and each alert are locked independently: inserting a new
/// name touches one map shard, while every field update runs under that
/// alert's own mutex. Reports to one name are linearized; reports to
/// different names do not contend on alert state.
pub struct AlertRegistry {
    alerts: DashMap<String, Arc<Mutex<Alert>>>,
    default_level: Level,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::with_default_level(Level::default())
    }

    /// Registry whose lazily created alerts start at `level`
    pub fn with_default_level(level: Level) -> Self {
        Self {
            alerts: DashMap::new(),
            default_level: level,
        }
    }

    /// Get the alert for `name`, creating it at the default level if absent
    pub fn get_or_new(&self, name: &str) -> Result<AlertRef, RegistryError> {
        let slot = self.slot(name)?;
        Ok(AlertRef {
            guard: slot.lock_arc(),
        })
    }

    /// Look up an alert without creating it
    pub fn get(&self, name: &str) -> Option<AlertRef> {
        let slot = self.alerts.get(name).map(|s| Arc::clone(&s))?;
        Some(AlertRef {
            guard: slot.lock_arc(),
        })
    }

    /// End a checkout obtained from [`get_or_new`](Self::get_or_new) or [`get`](Self::get)
    pub fn release(&self, alert: AlertRef) {
        drop(alert);
    }

    /// Snapshot every tracked alert, sorted by name
    pub fn all(&self) -> Result<Vec<Alert>, RegistryError> {
        let slots: Vec<Arc<Mutex<Alert>>> =
            self.alerts.iter().map(|e| Arc::clone(e.value())).collect();

        let mut alerts: Vec<Alert> = slots.iter().map(|slot| slot.lock().clone()).collect();
        alerts.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(alerts)
    }

    /// Record a report of `level` for `name`
    ///
    /// The whole compare-and-update happens inside the alert's exclusive
    /// section, so concurrent reports never decide on a torn read.
    pub fn report(&self, name: &str, level: Level) -> Result<ReportOutcome, RegistryError> {
        let slot = self.slot(name)?;
        let mut alert = slot.lock();

        let previous = alert.level();
        let changed = alert.apply(level, Utc::now());

        if changed {
            tracing::debug!(
                alert = %name,
                from = %previous,
                to = %level,
                "Alert level changed"
            );
        }

        Ok(ReportOutcome {
            changed,
            alert: alert.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    fn slot(&self, name: &str) -> Result<Arc<Mutex<Alert>>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        if let Some(slot) = self.alerts.get(name) {
            return Ok(Arc::clone(&slot));
        }

        let slot = self
            .alerts
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(alert = %name, "New alert");
                Arc::new(Mutex::new(Alert::new(name, self.default_level)))
            });

        Ok(Arc::clone(&slot))
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("alert name must not be empty")]
    EmptyName,
}
