//! WebSocket Chat Hub - Entry Point
//!
//! Parses configuration, starts the listener and serves until Ctrl+C.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_hub::{serve, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_hub=info")),
        )
        .init();

    let config = Config::parse();

    // Start TCP listener
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        "WebSocket Chat Hub listening on ws://{}{}",
        listener.local_addr()?,
        config.path
    );

    tokio::select! {
        _ = serve(listener, config) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
