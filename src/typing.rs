//! Typing tracker
//!
//! Which participants are currently flagged as typing. Keyed by connection
//! so two participants sharing a nickname do not clear each other. The
//! debounce itself is the client's job; this only records the latest flag.

use std::collections::BTreeMap;

use crate::types::ConnectionId;

#[derive(Debug, Default)]
pub struct TypingTracker {
    typing: BTreeMap<ConnectionId, String>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest typing flag for a connection
    ///
    /// Returns true if the state changed. Repeating `true`, or sending
    /// `false` while not typing, is a no-op.
    pub fn set(&mut self, connection_id: ConnectionId, nickname: &str, is_typing: bool) -> bool {
        if is_typing {
            self.typing
                .insert(connection_id, nickname.to_string())
                .is_none()
        } else {
            self.typing.remove(&connection_id).is_some()
        }
    }

    /// Drop a connection's flag; same path as an explicit stop
    ///
    /// Returns true if the connection was flagged as typing.
    pub fn clear(&mut self, connection_id: ConnectionId) -> bool {
        self.typing.remove(&connection_id).is_some()
    }

    /// Nicknames currently typing
    pub fn nicknames(&self) -> Vec<&str> {
        self.typing.values().map(String::as_str).collect()
    }
}
