//! Error types for the chat hub
//!
//! Defines fatal per-connection errors, hub event errors and outbound
//! queue errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Fatal for the task that returns them: a connection handler or the
/// accept loop. Never reaches the hub.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Channel send error (fatal - hub command channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Hub event errors
///
/// Returned by hub operations when an inbound event is dropped. None of
/// these stop the hub; the dispatch loop logs them and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    /// Inbound payload could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// `message` or `typing` received before `join`
    #[error("Connection has not joined")]
    NotJoined,

    /// `join` received on a connection that already joined
    #[error("Connection already joined")]
    AlreadyJoined,

    /// Nickname is empty after trimming
    #[error("Nickname is empty")]
    EmptyNickname,

    /// Chat message body is empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Connection is closed or unknown to the hub
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Outbound queue errors
///
/// Occurs when the hub cannot enqueue an event for a connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
