//! # beaconwatch-server
//!
//! HTTP server for the beaconwatch Eddystone presence tracker.
//!
//! This binary provides:
//! - REST API for beacon presence, scan control, and proximity ranking
//! - OpenAPI documentation at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development (mock radio)
//! cargo run --package beaconwatch-server
//!
//! # With BlueZ
//! cargo run --package beaconwatch-server --features bluetooth
//! ```
//!
//! The configuration file defaults to `/etc/beaconwatch/config.toml` and can
//! be overridden with `BEACONWATCH_CONFIG`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use beaconwatch_core::Config;
use beaconwatch_server::api::create_router;
use beaconwatch_server::logging;
use beaconwatch_server::state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "BEACONWATCH_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(Config::default_path, PathBuf::from);
    let config = Config::load_or_default(&config_path)
        .map_err(beaconwatch_core::BeaconError::from)
        .with_context(|| format!("Loading {}", config_path.display()))?;

    logging::init(&config.logging)?;

    info!(
        config = %config_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting beaconwatch-server"
    );

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .context("Invalid server.bind_address")?;

    let state = AppState::start(config).await?;
    state.scanner().start().await?;

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
