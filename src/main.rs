use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use firm_site_api::config::AppConfig;
use firm_site_api::database::{DatabaseManager, PgRecordStore};
use firm_site_api::rate_limit::RateLimiter;
use firm_site_api::routes;
use firm_site_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Firm Site API in {:?} mode", config.environment);

    let database = DatabaseManager::connect_lazy(&config.database)?;
    let store = Arc::new(PgRecordStore::new(database.pool().clone()));

    let rate_limiter = Arc::new(RateLimiter::new());
    let sweeper = rate_limiter
        .clone()
        .spawn_sweeper(Duration::from_secs(config.rate_limit.sweep_interval_secs.max(1)));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::new(config, store, rate_limiter);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    database.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
