//! Basic type definitions for the chat hub
//!
//! Provides `ConnectionId`, the UUID-based identity the hub keys all
//! per-connection state on. Nicknames are display-only and never used as keys.

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Assigned by the connection handler right after the WebSocket handshake.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
