//! Accept loop
//!
//! Starts the Hub actor and spawns one handler task per accepted TCP
//! connection.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::hub::Hub;

/// Serve connections from `listener` until the task is dropped
pub async fn serve(listener: TcpListener, config: Config) {
    let config = Arc::new(config);

    // Create Hub actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let hub = Hub::new(cmd_rx, config.history_capacity);
    tokio::spawn(hub.run());

    info!("Hub actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let config = Arc::clone(&config);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    match handle_connection(stream, cmd_tx, config).await {
                        Ok(()) => {}
                        Err(AppError::WebSocket(e)) => {
                            warn!("Handshake or transport failure from {}: {}", addr, e);
                        }
                        Err(e) => {
                            error!("Connection handler error: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
