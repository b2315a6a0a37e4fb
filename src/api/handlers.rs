use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alert::{Alert, AlertRegistry, Level};

/// Error header carried by every failed API response
pub const ERROR_HEADER: HeaderName = HeaderName::from_static("x-error");

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Read side of the alert registry, as seen by the HTTP layer
pub trait AlertSource: Send + Sync {
    fn alerts(&self) -> Result<Vec<Alert>, SourceError>;
}

impl AlertSource for AlertRegistry {
    fn alerts(&self) -> Result<Vec<Alert>, SourceError> {
        Ok(self.all()?)
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub alerts: Arc<dyn AlertSource>,
}

impl AppState {
    pub fn new(alerts: Arc<dyn AlertSource>) -> Self {
        Self { alerts }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Deserialize)]
pub struct AlertsQuery {
    pub level: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AlertView {
    pub name: String,
    pub level: Level,
    pub count: u64,
    pub updated_at: String,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            name: alert.name().to_string(),
            level: alert.level(),
            count: alert.count(),
            updated_at: alert
                .last_change()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<AlertView>>, ApiError> {
    let level = match query.level.as_deref() {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<Level>()
                .map_err(|_| ApiError::BadRequest("bad level value".to_string()))?,
        ),
        _ => None,
    };

    let alerts = state.alerts.alerts().map_err(|e| {
        tracing::error!(error = %e, "Failed to list alerts");
        ApiError::Internal(e.to_string())
    })?;

    let views = alerts
        .iter()
        .filter(|alert| level.map_or(true, |l| alert.has_level(l)))
        .map(AlertView::from)
        .collect();

    Ok(Json(views))
}

// ============================================================================
// Error Handling
// ============================================================================

/// Failed responses carry the message in `X-Error` and an empty body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        // Header values cannot hold control characters
        let sanitized: String = message
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let value = HeaderValue::from_str(&sanitized)
            .unwrap_or_else(|_| HeaderValue::from_static("internal error"));

        (status, [(ERROR_HEADER, value)]).into_response()
    }
}
