//! Hotel API Server
//!
//! Configuration comes from the TOML file named by `HOTEL_CONFIG` (with
//! environment overrides) or from the environment alone. Without
//! `DATABASE_URL` the server runs on seeded in-memory stores.

use hotel_api::{create_router, state::AppState, telemetry::init_tracing};
use hotel_core::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    config.validate()?;

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = if config.database.url.is_some() {
        AppState::postgres(config).await?
    } else {
        warn!("DATABASE_URL not set; using in-memory stores");
        AppState::in_memory(config)?
    };

    let state = Arc::new(state);
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Hotel API Server starting on http://{}", addr);
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Hotel API Server stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("HOTEL_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Wait for ctrl-c, then report not-ready while in-flight requests drain
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    state.set_ready(false);
    info!("Shutdown signal received");
}
