//! Token Keeper
//!
//! Single-binary service that:
//! 1. Loads client credentials and provider settings
//! 2. Acquires an access token with the client-credentials grant
//! 3. Refreshes it before expiry on a fixed tick
//! 4. Reports token freshness on /health and /metrics
//!
//! `--once` acquires a single token, prints it to stdout and exits.

mod config;
mod metrics;
mod refresh;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use client_credentials::TokenManager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    manager: Arc<TokenManager>,
    prometheus: PrometheusHandle,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    // CLI: --config <path> and --once
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let once = args.iter().any(|a| a == "--once");

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let manager = Arc::new(config.build_manager().context("invalid provider settings")?);

    info!(
        token_url = %manager.token_url(),
        client_id = manager.client_id(),
        token_pattern = %manager.pattern(),
        interval_secs = config.refresh.interval_secs,
        threshold_secs = config.refresh.threshold_secs,
        "configuration loaded"
    );

    if once {
        manager.acquire().await.context("token acquisition failed")?;
        println!("{}", manager.current_token());
        return Ok(());
    }

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    initial_acquire(&manager).await;

    let refresh_handle = refresh::spawn_refresh_task(
        Arc::clone(&manager),
        config.refresh_interval(),
        config.refresh_threshold(),
    );

    match &config.server {
        Some(server) => {
            let app = build_router(AppState {
                manager: Arc::clone(&manager),
                prometheus: prometheus_handle,
            });
            let listener = TcpListener::bind(server.listen_addr)
                .await
                .with_context(|| format!("failed to bind to {}", server.listen_addr))?;
            info!(addr = %server.listen_addr, "serving /health and /metrics");

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!(error = %e, "server error during shutdown");
            }
        }
        None => shutdown_signal().await,
    }

    refresh_handle.abort();
    info!("shutdown complete");
    Ok(())
}

/// First acquisition at startup. A failure is not fatal; the refresh task retries.
async fn initial_acquire(manager: &TokenManager) {
    if let Err(e) = manager.acquire().await {
        warn!(
            error_kind = e.kind(),
            error = %e.log_summary(),
            "initial token acquisition failed, refresh task will retry"
        );
    }
    metrics::set_expires_in(manager.time_until_expiration().num_seconds());
}

/// Health endpoint: 200 while a fresh token is held, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    // Both fields come from one token/expiration pair.
    let snapshot = state.manager.snapshot();
    let expired = snapshot.as_ref().is_none_or(|s| s.is_expired());
    let expires_in = snapshot
        .as_ref()
        .map_or(0, |s| s.time_until_expiration().num_seconds());

    let (status_code, status) = if expired {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (axum::http::StatusCode::OK, "healthy")
    };

    let body = serde_json::json!({
        "status": status,
        "token_expired": expired,
        "expires_in_seconds": expires_in,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
