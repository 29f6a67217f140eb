//! HTTP server for arogyad

use crate::routes;
use anyhow::{Context, Result};
use arogya_common::config::ServerConfig;
use arogya_common::FallbackResolver;
use axum::Router;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub resolver: Arc<FallbackResolver>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(resolver: FallbackResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            start_time: Instant::now(),
        }
    }
}

/// Router with every route and middleware layer attached
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(routes::ask_routes())
        .merge(routes::health_routes())
        .merge(routes::intent_routes())
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = app(state, Duration::from_secs(config.request_timeout_secs.max(1)));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("[BOOT] Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
