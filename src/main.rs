//! rr-balancer: round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌───────────────────────────────────────────────┐
//!     ────────────────────┼─▶ http::server ─▶ http::dispatcher            │
//!                         │                        │                      │
//!                         │                        ▼                      │
//!                         │              load_balancer::pool              │
//!                         │               (round-robin cursor)            │
//!                         │                        │                      │
//!                         │                        ▼                      │
//!     Client Response     │   load_balancer::upstream ─▶ http::forwarder ─┼──▶ Upstream
//!     ◀───────────────────┼──────────────── streamed response ◀───────────┼─── Server
//!                         └───────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from flags or `LB_*` environment variables; see
//! `rr-balancer --help`.

use clap::Parser;
use tokio::net::TcpListener;

use rr_balancer::config::Cli;
use rr_balancer::observability::init_logging;
use rr_balancer::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    init_logging(&config.observability)?;

    tracing::info!("rr-balancer v{} starting", env!("CARGO_PKG_VERSION"));
    let config_json = serde_json::to_string(&config)?;
    tracing::debug!(config = %config_json, "Configuration loaded");

    let server = HttpServer::new(config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to build upstream pool");
    })?;

    let bind_address = server.config().listener.bind_address();
    let listener = TcpListener::bind(&bind_address).await.inspect_err(|e| {
        tracing::error!(address = %bind_address, error = %e, "Failed to bind listener");
    })?;

    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
