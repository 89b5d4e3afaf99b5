//! RSVP Server
//!
//! This binary:
//! - Loads `.env` and configuration
//! - Installs the Prometheus recorder and serves `/metrics`
//! - Connects to `PostgreSQL` and applies migrations
//! - Serves the HTTP API until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! docker compose up -d postgres
//! AUTH_JWT_SECRET=... cargo run --bin server
//! ```

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use rsvp::auth::JwtAuthenticator;
use rsvp::metrics::register_metrics;
use rsvp::{AppState, Config, Services, build_router};
use rsvp_core::Backend;
use rsvp_core::environment::SystemClock;
use rsvp_postgres::PostgresBackend;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rsvp=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RSVP server...");

    let config = Config::from_env();
    tracing::info!(
        postgres = %config.postgres.url.split('@').next_back().unwrap_or("unknown"),
        api = %config.server.port,
        metrics = %config.server.metrics_port,
        "Configuration loaded"
    );
    if config.auth.uses_dev_secret() {
        tracing::warn!("AUTH_JWT_SECRET is not set, using the development secret");
    }

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    register_metrics();

    let backend = PostgresBackend::connect(
        &config.postgres.url,
        config.postgres.max_connections,
        config.postgres.min_connections,
        config.postgres.connect_timeout,
    )
    .await?;

    if config.postgres.run_migrations {
        backend.migrate().await?;
        tracing::info!("Migrations applied");
    }

    let backend: Arc<dyn Backend> = Arc::new(backend);
    let services = Services::new(backend, Arc::new(SystemClock));
    let authenticator = Arc::new(JwtAuthenticator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_audience.as_deref(),
    ));
    let app = build_router(AppState::new(services, authenticator));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Metrics listener
    let metrics_addr = config.server.metrics_addr()?;
    let metrics_app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { prometheus.render() }),
    );
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("Failed to bind metrics listener on {metrics_addr}"))?;
    let mut metrics_shutdown = shutdown_tx.subscribe();
    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_app)
            .with_graceful_shutdown(async move {
                let _ = metrics_shutdown.recv().await;
            })
            .await
    });
    tracing::info!(%metrics_addr, "Metrics listening");

    // API listener
    let api_addr = config.server.api_addr()?;
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {api_addr}"))?;
    tracing::info!(%api_addr, "RSVP server is running, press Ctrl+C to shut down");

    let signal_tx = shutdown_tx.clone();
    axum::serve(api_listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down gracefully...");
            let _ = signal_tx.send(());
        })
        .await
        .context("API server error")?;

    let _ = shutdown_tx.send(());
    match metrics_server.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Metrics server error"),
        Err(e) => tracing::error!(error = %e, "Metrics server task failed"),
        Ok(Ok(())) => {},
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
