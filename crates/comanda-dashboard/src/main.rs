//! Comanda live order dashboard - Entry Point
//!
//! Connects to the storefront backend, mirrors the order list, and
//! keeps an audible alert running while any order awaits action.

use anyhow::Result;
use clap::Parser;
use comanda_dashboard::{AppConfig, BackendClient, LiveOrdersSession, TerminalBell};
use std::sync::Arc;
use tracing::info;

/// Comanda live order dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via COMANDA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    comanda_ws::init_crypto();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    comanda_telemetry::init_logging()?;

    info!("Starting Comanda dashboard v{}", env!("CARGO_PKG_VERSION"));

    // Determine config: CLI arg > COMANDA_CONFIG env var > default path
    let config = match &args.config {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            AppConfig::from_file(path)?
        }
        None => AppConfig::load()?,
    };
    info!(base_url = %config.base_url, ws_url = %config.ws_url, "Configuration loaded");

    // The backend client serves both the snapshot fetch and the
    // lifecycle commands.
    let client = Arc::new(BackendClient::new(&config.base_url, config.auth_token())?);

    let session = LiveOrdersSession::new(
        &config,
        client.clone(),
        client,
        Arc::new(TerminalBell::new()),
    );

    // The startup snapshot is mandatory; without it the dashboard
    // would show an empty list as if there were no orders.
    session.load_snapshot().await?;

    // Run the feed loop until shutdown
    session.run().await?;

    Ok(())
}
