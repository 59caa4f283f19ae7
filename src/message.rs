//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. The `type` field
//! discriminates every frame in both directions.

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the chat under a nickname
    Join { nickname: String },
    /// Send a chat message
    Message { message: String },
    /// Typing indicator change
    Typing {
        #[serde(rename = "isTyping", default)]
        is_typing: bool,
    },
    /// Any event type this server does not know about
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode one inbound frame payload
    ///
    /// Anything that is not a JSON object with a `type` field, or whose
    /// known variant is missing required fields, is a malformed frame.
    pub fn decode(payload: &[u8]) -> Result<Self, HubError> {
        serde_json::from_slice(payload).map_err(|e| HubError::MalformedFrame(e.to_string()))
    }
}

/// A chat message as stored in history and broadcast to participants
///
/// Immutable once created; `nickname` is a copy so it outlives the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub nickname: String,
    pub message: String,
    pub timestamp: String,
}

/// One roster entry in a `users` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub nickname: String,
    pub joined_at: String,
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent only to the joining connection
    Welcome { message: String, timestamp: String },
    /// History replay sent only to the joining connection
    History { messages: Vec<ChatMessage> },
    /// Chat message
    Message(ChatMessage),
    /// Join/leave notice
    System { message: String, timestamp: String },
    /// Full roster snapshot
    Users { users: Vec<UserEntry>, count: usize },
    /// Another participant started or stopped typing
    Typing {
        nickname: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

impl ServerMessage {
    pub fn system(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        ServerMessage::System {
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn typing(nickname: impl Into<String>, is_typing: bool) -> Self {
        ServerMessage::Typing {
            nickname: nickname.into(),
            is_typing,
        }
    }
}
