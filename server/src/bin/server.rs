//! SurfStay server
//!
//! # Usage
//!
//! ```bash
//! # PostgreSQL
//! DATABASE_URL=postgres://... XENDIT_SECRET_KEY=xnd_... cargo run --bin surfstay-server
//!
//! # Local development without a database
//! USE_IN_MEMORY_STORE=true cargo run --bin surfstay-server
//! ```

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use surfstay_core::metrics::register_business_metrics;
use surfstay_server::{Config, SurfStayApp};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SurfStay server...");

    let metrics_addr: SocketAddr = config
        .metrics_addr()
        .parse()
        .context("invalid METRICS_HOST/METRICS_PORT")?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("failed to install Prometheus exporter")?;
    register_business_metrics();
    tracing::info!(addr = %metrics_addr, "Metrics exporter listening");

    let app = SurfStayApp::new(&config).await?;
    let router = app.router();

    let listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr()))?;
    tracing::info!(addr = %config.http_addr(), "HTTP API listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully...");
    shutdown_tx.send(()).ok();

    match tokio::time::timeout(Duration::from_secs(config.server.shutdown_timeout), server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!("Shutdown timeout elapsed, dropping open connections"),
    }

    tracing::info!("Server stopped");
    Ok(())
}
