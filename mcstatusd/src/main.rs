mod config;
mod address;
mod motd;
mod query;
mod status;
mod api;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::address::srv::{HickorySrvDiscovery, SrvDiscovery};
use crate::config::Config;
use crate::query::MinecraftQuery;
use crate::status::StatusService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mcstatusd=info"))
        )
        .init();

    tracing::info!("Starting mcstatusd");

    // Load config, falling back to built-in defaults
    let config = match std::env::args().nth(1) {
        Some(config_path) => {
            let config = Config::load(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path))?;
            tracing::info!("Loaded config from {}", config_path);
            config
        }
        None => {
            tracing::info!("No config file given, using defaults");
            Config::default()
        }
    };

    // SRV discovery is shared by address resolution and the Java query client
    let srv: Arc<dyn SrvDiscovery> = Arc::new(HickorySrvDiscovery::new(config.dns.use_system_conf));
    let query = Arc::new(MinecraftQuery::new(srv.clone(), &config.query));
    let status = Arc::new(StatusService::new(srv, query));

    // Build API router
    let app_state = api::routes::AppState {
        status,
        log_favicon_requests: config.api.log_favicon_requests,
    };
    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();

    if let Err(e) = server_handle.await {
        tracing::error!("Server task failed: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
