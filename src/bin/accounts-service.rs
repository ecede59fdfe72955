//! Accounts service: login, registration, token validation and
//! token-guarded profile updates.
//!
//! Shares the gateway's configuration file; only the `tokens`, `accounts`,
//! `timeouts` and `observability` sections are used.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::accounts::AccountsServer;
use edge_gateway::lifecycle::{startup::bootstrap, Shutdown};

#[derive(Parser)]
#[command(name = "accounts-service")]
#[command(about = "Accounts and token service", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `accounts.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = bootstrap(args.config.as_deref())?;

    let bind_address = args.bind.unwrap_or_else(|| config.accounts.bind_address.clone());
    let listener = TcpListener::bind(&bind_address).await?;

    let server = AccountsServer::new(&config);
    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
