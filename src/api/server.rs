use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, list_alerts, AppState};
use crate::config::ApiConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ApiConfig::default().into()
    }
}

impl From<ApiConfig> for ServerConfig {
    fn from(api: ApiConfig) -> Self {
        Self {
            host: api.host,
            port: api.port,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/alerts", get(list_alerts))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C
pub async fn run_server(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting Lookout API on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Lookout API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler the server runs until the process is killed
            tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{Alert, AlertRegistry, Level};
    use crate::api::handlers::{AlertSource, SourceError};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    struct BrokenSource;

    impl AlertSource for BrokenSource {
        fn alerts(&self) -> Result<Vec<Alert>, SourceError> {
            Err("registry unavailable".into())
        }
    }

    fn create_test_app() -> Router {
        let registry = Arc::new(AlertRegistry::new());
        registry.report("db.lag", Level::Error).unwrap();
        registry.report("api.latency", Level::Warning).unwrap();
        registry.report("api.latency", Level::Warning).unwrap();
        registry.report("disk.free", Level::Success).unwrap();

        build_router(Arc::new(AppState::new(registry)))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = get_json(create_test_app(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_list_alerts_sorted() {
        let (status, body) = get_json(create_test_app(), "/api/v1/alerts").await;

        assert_eq!(status, StatusCode::OK);
        let alerts = body.as_array().unwrap();
        let names: Vec<&str> = alerts.iter().map(|a| a["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["api.latency", "db.lag", "disk.free"]);

        assert_eq!(alerts[0]["level"], "warning");
        assert_eq!(alerts[0]["count"], 2);
        assert!(alerts[0]["updated_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_list_alerts_by_level() {
        let (status, body) = get_json(create_test_app(), "/api/v1/alerts?level=error").await;

        assert_eq!(status, StatusCode::OK);
        let alerts = body.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["name"], "db.lag");
    }

    #[tokio::test]
    async fn test_bad_level_value() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/alerts?level=critical")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-error"], "bad level value");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_source_failure() {
        let app = build_router(Arc::new(AppState::new(Arc::new(BrokenSource))));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/alerts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-error"], "registry unavailable");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let app = build_router(Arc::new(AppState::new(Arc::new(AlertRegistry::new()))));
        let (status, body) = get_json(app, "/api/v1/alerts").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }
}
