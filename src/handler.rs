//! WebSocket connection handler
//!
//! Handles individual connections: WebSocket handshake on the configured
//! path, frame decoding, and bidirectional communication with the Hub.

use std::sync::Arc;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::hub::HubCommand;
use crate::message::{ClientMessage, ServerMessage};
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers with the Hub, then runs a
/// read task (frames → `HubCommand`) and a write task (`ServerMessage` →
/// frames) until either side ends. The Hub is told about the disconnect
/// exactly once, from here.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<HubCommand>,
    config: Arc<Config>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake, only on the configured path
    let endpoint = config.path.clone();
    let check_path = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == endpoint {
            return Ok(resp);
        }
        let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
        *rejection.status_mut() = StatusCode::NOT_FOUND;
        Err(rejection)
    };
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    let (mut ws_sender, ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!("Connection {} opened from {}", connection_id, peer_addr);

    // Hub -> connection outbound queue; the hub never waits on a slow reader
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

    if cmd_tx
        .send(HubCommand::Connect {
            connection_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - hub closed", connection_id);
        return Err(AppError::ChannelSend);
    }

    // Close frame the reader wants sent before the socket goes away
    let (close_tx, mut close_rx) = oneshot::channel::<Message>();

    let cmd_tx_read = cmd_tx.clone();
    let mut read_task = tokio::spawn(async move {
        if let Some(frame) = read_frames(connection_id, ws_receiver, cmd_tx_read).await {
            let _ = close_tx.send(frame);
        }
        debug!("Read task ended for {}", connection_id);
    });

    let mut write_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                frame = &mut close_rx => {
                    if let Ok(frame) = frame {
                        let _ = ws_sender.send(frame).await;
                    }
                    break;
                }
                msg = msg_rx.recv() => {
                    let Some(msg) = msg else { break };
                    match serde_json::to_string(&msg) {
                        Ok(json) => {
                            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                debug!("WebSocket send failed, ending write task");
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                        }
                    }
                }
            }
        }
        debug!("Write task ended for {}", connection_id);

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", connection_id);
            read_task.abort();
        }
    }

    // Removing the connection drops its outbound queue, which lets a
    // still-running write task flush and close
    let _ = cmd_tx.send(HubCommand::Disconnect { connection_id }).await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Forward decoded frames to the Hub until the transport ends
///
/// Returns the close frame to send back when the peer broke the protocol.
async fn read_frames(
    connection_id: ConnectionId,
    mut ws_receiver: SplitStream<WebSocketStream<TcpStream>>,
    cmd_tx: mpsc::Sender<HubCommand>,
) -> Option<Message> {
    while let Some(msg_result) = ws_receiver.next().await {
        let decoded = match msg_result {
            Ok(Message::Text(text)) => ClientMessage::decode(text.as_bytes()),
            Ok(Message::Binary(data)) => ClientMessage::decode(&data),
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close frame", connection_id);
                return None;
            }
            Ok(_) => {
                // Ping/Pong are answered by tungstenite
                continue;
            }
            Err(e) => {
                error!("WebSocket error for {}: {}", connection_id, e);
                return None;
            }
        };

        let client_msg = match decoded {
            Ok(client_msg) => client_msg,
            Err(e) => {
                warn!("Closing {}: {}", connection_id, e);
                return Some(Message::Close(Some(CloseFrame {
                    code: CloseCode::Protocol,
                    reason: "Protocol error".into(),
                })));
            }
        };

        let Some(cmd) = client_message_to_command(connection_id, client_msg) else {
            debug!("Ignoring unknown event type from {}", connection_id);
            continue;
        };

        if cmd_tx.send(cmd).await.is_err() {
            debug!("Hub closed, ending read task for {}", connection_id);
            return None;
        }
    }

    None
}

/// Convert a ClientMessage to a HubCommand
fn client_message_to_command(
    connection_id: ConnectionId,
    msg: ClientMessage,
) -> Option<HubCommand> {
    let cmd = match msg {
        ClientMessage::Join { nickname } => HubCommand::Join {
            connection_id,
            nickname,
        },
        ClientMessage::Message { message } => HubCommand::Message {
            connection_id,
            message,
        },
        ClientMessage::Typing { is_typing } => HubCommand::Typing {
            connection_id,
            is_typing,
        },
        ClientMessage::Unknown => return None,
    };
    Some(cmd)
}
