use anyhow::{Context, Result};
use common::DumpReplayParser;
use server::config::Config;
use server::http_server::run_http_server;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if exists
    dotenv::dotenv().ok();

    // Initialize tracing
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env().context("Failed to load server configuration")?;
    info!("Starting replay analyzer with {:?}", config);

    let cancellation_token = CancellationToken::new();
    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal. Shutting down gracefully...");
                shutdown_token.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    info!("Server starting. Press Ctrl+C to stop");
    run_http_server(config, Arc::new(DumpReplayParser), cancellation_token).await?;

    info!("Server shut down successfully");
    Ok(())
}
