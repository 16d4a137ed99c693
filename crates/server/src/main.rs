//! shelter-proxy entry point.
//!
//! Boots an HTTP proxy in front of the application origin: the current
//! cache generation is provisioned and activated, then every request is
//! routed through the controller.
//! Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use shelter_client::{FetchConfig, HttpNetwork};
use shelter_core::{AppConfig, CacheDb, ProxyController};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let settings = config.settings()?;
    let origin = settings.origin.clone();

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let upstream = HttpNetwork::new(FetchConfig::from(&config))?;
    let controller = Arc::new(ProxyController::new(settings, store, Arc::new(upstream.clone())));

    let report = controller.start().await?;
    if report.is_complete() {
        tracing::info!(generation = %report.generation, assets = report.total(), "generation provisioned");
    } else {
        tracing::warn!(
            generation = %report.generation,
            failed = report.failed.len(),
            total = report.total(),
            "generation partially provisioned"
        );
    }

    let app = handler::router(handler::ProxyState {
        controller,
        upstream,
        origin,
        max_body_bytes: config.max_bytes,
    });

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    tracing::info!(listen = %config.listen, origin = %config.origin, "Starting shelter-proxy");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shelter-proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
