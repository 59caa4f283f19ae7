//! Connection struct definition
//!
//! The hub's view of one participant's transport: its identity, the
//! sending half of its outbound queue, and where it is in its lifecycle.
//! The transport itself is owned by the connection's handler task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ConnectionId;

/// Connection lifecycle as seen by the hub
///
/// The handshake phase happens in the handler before the hub learns
/// about the connection, so the hub starts at `PendingJoin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Open, waiting for a valid `join`
    PendingJoin,
    /// Open and present in the registry
    Joined,
    /// Terminal; every further send is refused
    Closed,
}

/// Hub-side connection handle
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Hub → connection outbound queue, drained by the write task
    sender: mpsc::UnboundedSender<ServerMessage>,
    state: ConnectionState,
}

impl Connection {
    /// Create a pending connection with the given ID and outbound queue
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            state: ConnectionState::PendingJoin,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_joined(&self) -> bool {
        self.state == ConnectionState::Joined
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Move from `PendingJoin` to `Joined`; any other state is left alone
    pub fn mark_joined(&mut self) {
        if self.state == ConnectionState::PendingJoin {
            self.state = ConnectionState::Joined;
        }
    }

    /// Enter the terminal state
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Enqueue a message for this connection without waiting
    ///
    /// Fails only when the write task is gone. That closes the connection;
    /// the hub is expected to run its disconnect path afterwards.
    pub fn send(&mut self, msg: ServerMessage) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::ChannelClosed);
        }

        self.sender.send(msg).map_err(|_| {
            self.state = ConnectionState::Closed;
            SendError::ChannelClosed
        })
    }
}
