//! Lookout Server
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - LOOKOUT_CONFIG: Path to the YAML config (default: config.yml)
//! - LOOKOUT_HOST: Bind address, overrides `global.api.host`
//! - LOOKOUT_PORT: Port number, overrides `global.api.port`
//! - RUST_LOG: Log level (default: lookout=info,tower_http=info)
//!
//! The server exposes alert state over HTTP. Check scripts are scheduled
//! externally and run against the engine's script environment.

use std::sync::Arc;

use lookout::api::{run_server, AppState, ServerConfig};
use lookout::{Config, Engine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::var("LOOKOUT_CONFIG").unwrap_or_else(|_| "config.yml".to_string());
    let config = Config::from_file(&path).map_err(|e| {
        tracing::error!(path = %path, error = %e, "Failed to load configuration");
        e
    })?;

    let mut server = ServerConfig::from(config.global.api.clone());
    if let Ok(host) = std::env::var("LOOKOUT_HOST") {
        server.host = host;
    }
    if let Some(port) = std::env::var("LOOKOUT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
    {
        server.port = port;
    }

    tracing::info!("Lookout configuration:");
    tracing::info!("  Config: {}", path);
    tracing::info!("  Listen: {}:{}", server.host, server.port);
    tracing::info!("  Default timeout: {:?}", config.global.default_timeout);
    tracing::info!("  Channels: {}", config.channels.names().join(", "));
    tracing::info!("  Datasources: {}", config.datasources.len());

    let engine = Engine::from_config(&config)?;
    let state = Arc::new(AppState::new(engine.registry().clone()));

    run_server(server, state).await
}
