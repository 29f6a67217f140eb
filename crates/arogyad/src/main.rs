//! Arogya Daemon - health question answering over HTTP
//!
//! Loads the intent catalog and topic records once, then serves the
//! resolution chain on a local port.

use anyhow::Result;
use arogya_common::{Config, FallbackResolver, StartupDataError};
use arogyad::server::{self, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] Arogya Daemon v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load();

    let resolver = match FallbackResolver::from_config(&config) {
        Ok(r) => r,
        Err(e) => {
            let kind = e
                .chain()
                .find_map(|c| c.downcast_ref::<StartupDataError>())
                .map(StartupDataError::kind)
                .unwrap_or("other");
            error!("[FATAL] Failed to load data ({}): {:#}", kind, e);
            std::process::exit(78);
        }
    };
    info!(
        "[BOOT] {} intents, {} patterns, {} records, encoder {}",
        resolver.catalog().len(),
        resolver.catalog().pattern_count(),
        resolver.records().len(),
        resolver.encoder_name()
    );

    server::run(AppState::new(resolver), &config.server).await
}
