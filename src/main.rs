//! Edge gateway.
//!
//! A single entry point in front of independent backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                   EDGE GATEWAY                    │
//!                              │                                                   │
//!     Client Request           │  ┌─────────┐    ┌──────────────┐    ┌──────────┐ │
//!     ─────────────────────────┼─▶│  http   │───▶│   routing    │───▶│ security │ │
//!                              │  │ server  │    │ route table  │    │ key gate │ │
//!                              │  └─────────┘    └──────────────┘    └────┬─────┘ │
//!                              │                                          │       │
//!                              │                                          ▼       │
//!     Client Response          │  ┌─────────┐                      ┌──────────┐  │
//!     ◀────────────────────────┼──│response │◀─────────────────────│dispatcher│◀─┼──── Backend
//!                              │  └─────────┘                      └──────────┘  │     Service
//!                              │                                                   │
//!                              │  ┌─────────────────────────────────────────────┐ │
//!                              │  │            Cross-Cutting Concerns            │ │
//!                              │  │  config · observability · lifecycle          │ │
//!                              │  └─────────────────────────────────────────────┘ │
//!                              └──────────────────────────────────────────────────┘
//! ```
//!
//! The accounts service (`accounts-service` binary) issues the bearer tokens
//! and guards profile updates behind the gateway.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::http::HttpServer;
use edge_gateway::lifecycle::{startup::bootstrap, Shutdown};
use edge_gateway::observability::metrics::init_metrics;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Path-prefix API gateway", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults and GATEWAY_* variables apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = bootstrap(args.config.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    // Ctrl+C and SIGTERM are handled inside `run`.
    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
