//! Hub actor implementation
//!
//! The central actor that owns all shared chat state: connections, the
//! participant registry, the history buffer and the typing tracker.
//! Connection handlers only talk to it through `HubCommand`s, and the hub
//! handles one command at a time, so every mutation and the broadcasts it
//! triggers are serialized.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionState};
use crate::error::HubError;
use crate::history::HistoryBuffer;
use crate::message::{ChatMessage, ServerMessage};
use crate::registry::{Participant, Registry};
use crate::time::{format_time, Clock, SystemClock};
use crate::types::ConnectionId;
use crate::typing::TypingTracker;

/// Commands sent from connection handlers to the Hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// Handshake finished; connection is pending join
    Connect {
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    },
    /// Participant wants to join under a nickname
    Join {
        connection_id: ConnectionId,
        nickname: String,
    },
    /// Participant sent a chat message
    Message {
        connection_id: ConnectionId,
        message: String,
    },
    /// Participant's typing flag changed
    Typing {
        connection_id: ConnectionId,
        is_typing: bool,
    },
    /// Transport closed or failed
    Disconnect { connection_id: ConnectionId },
}

impl HubCommand {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            HubCommand::Connect { connection_id, .. }
            | HubCommand::Join { connection_id, .. }
            | HubCommand::Message { connection_id, .. }
            | HubCommand::Typing { connection_id, .. }
            | HubCommand::Disconnect { connection_id } => *connection_id,
        }
    }
}

/// The Hub actor
pub struct Hub {
    /// Every open connection, joined or not
    connections: HashMap<ConnectionId, Connection>,
    registry: Registry,
    history: HistoryBuffer,
    typing: TypingTracker,
    clock: Box<dyn Clock>,
    /// Recipients whose outbound queue closed during the current command,
    /// in the order they failed
    failed: Vec<ConnectionId>,
    /// Command receiver channel
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create a Hub keeping `history_capacity` messages for replay
    pub fn new(receiver: mpsc::Receiver<HubCommand>, history_capacity: usize) -> Self {
        Self {
            connections: HashMap::new(),
            registry: Registry::new(),
            history: HistoryBuffer::new(history_capacity),
            typing: TypingTracker::new(),
            clock: Box::new(SystemClock),
            failed: Vec::new(),
            receiver,
        }
    }

    /// Replace the server clock
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run the Hub event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(
            "Hub started (history capacity {})",
            self.history.capacity()
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Hub shutting down");
    }

    /// Process a single command, then disconnect any recipients that failed
    fn handle_command(&mut self, cmd: HubCommand) {
        let connection_id = cmd.connection_id();

        let result = match cmd {
            HubCommand::Connect {
                connection_id,
                sender,
            } => self.on_connect(connection_id, sender),
            HubCommand::Join {
                connection_id,
                nickname,
            } => self.on_join(connection_id, nickname),
            HubCommand::Message {
                connection_id,
                message,
            } => self.on_message(connection_id, message),
            HubCommand::Typing {
                connection_id,
                is_typing,
            } => self.on_typing(connection_id, is_typing),
            HubCommand::Disconnect { connection_id } => self.on_disconnect(connection_id),
        };

        if let Err(e) = result {
            debug!("Dropped event from {}: {}", connection_id, e);
        }

        self.reap_failed();
    }

    /// Register a pending connection
    fn on_connect(
        &mut self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), HubError> {
        info!("Connection {} registered", connection_id);
        self.connections
            .insert(connection_id, Connection::new(connection_id, sender));
        debug!(
            "Total connections: {}, joined: {}",
            self.connections.len(),
            self.registry.len()
        );
        Ok(())
    }

    /// Join a pending connection under a nickname
    fn on_join(&mut self, connection_id: ConnectionId, nickname: String) -> Result<(), HubError> {
        let conn = self
            .connections
            .get_mut(&connection_id)
            .ok_or(HubError::ConnectionClosed)?;

        match conn.state() {
            ConnectionState::PendingJoin => {}
            ConnectionState::Joined => return Err(HubError::AlreadyJoined),
            ConnectionState::Closed => return Err(HubError::ConnectionClosed),
        }

        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(HubError::EmptyNickname);
        }
        let nickname = nickname.to_string();

        let now = self.clock.now();
        let timestamp = format_time(&now);

        if !self
            .registry
            .insert(Participant::new(connection_id, nickname.clone(), now))
        {
            return Err(HubError::AlreadyJoined);
        }
        conn.mark_joined();

        info!("Connection {} joined as '{}'", connection_id, nickname);

        let welcome = ServerMessage::Welcome {
            message: format!(
                "Welcome {}! There are {} people in the chat.",
                nickname,
                self.registry.len()
            ),
            timestamp: timestamp.clone(),
        };
        self.unicast(connection_id, welcome);
        self.unicast(
            connection_id,
            ServerMessage::History {
                messages: self.history.snapshot(),
            },
        );

        self.broadcast(
            ServerMessage::system(format!("{} joined the chat", nickname), timestamp),
            None,
        );
        self.broadcast_users();

        Ok(())
    }

    /// Record and broadcast a chat message
    fn on_message(&mut self, connection_id: ConnectionId, message: String) -> Result<(), HubError> {
        let nickname = self.joined_nickname(connection_id)?;

        let body = message.trim();
        if body.is_empty() {
            return Err(HubError::EmptyMessage);
        }

        // Sending ends typing
        if self.typing.clear(connection_id) {
            self.broadcast(ServerMessage::typing(nickname.clone(), false), Some(connection_id));
        }

        let chat = ChatMessage {
            nickname,
            message: body.to_string(),
            timestamp: format_time(&self.clock.now()),
        };
        debug!("{}: {}", chat.nickname, chat.message);

        self.history.push(chat.clone());
        self.broadcast(ServerMessage::Message(chat), None);

        Ok(())
    }

    /// Update the typing flag and tell everyone else
    fn on_typing(&mut self, connection_id: ConnectionId, is_typing: bool) -> Result<(), HubError> {
        let nickname = self.joined_nickname(connection_id)?;

        if !self.typing.set(connection_id, &nickname, is_typing) {
            debug!("Typing state unchanged for {}", connection_id);
            return Ok(());
        }

        debug!("Typing: {:?}", self.typing.nicknames());
        self.broadcast(ServerMessage::typing(nickname, is_typing), Some(connection_id));

        Ok(())
    }

    /// Remove a connection and announce the departure if it had joined
    ///
    /// Safe to call any number of times for the same connection.
    fn on_disconnect(&mut self, connection_id: ConnectionId) -> Result<(), HubError> {
        let Some(mut conn) = self.connections.remove(&connection_id) else {
            debug!("Connection {} already disconnected", connection_id);
            return Ok(());
        };
        conn.close();

        let Some(participant) = self.registry.remove(connection_id) else {
            info!("Connection {} closed before joining", connection_id);
            return Ok(());
        };

        info!(
            "Connection {} ('{}') left",
            connection_id, participant.nickname
        );

        if self.typing.clear(connection_id) {
            self.broadcast(ServerMessage::typing(participant.nickname.clone(), false), None);
        }

        let timestamp = format_time(&self.clock.now());
        self.broadcast(
            ServerMessage::system(format!("{} left the chat", participant.nickname), timestamp),
            None,
        );
        self.broadcast_users();

        debug!(
            "Total connections: {}, joined: {}",
            self.connections.len(),
            self.registry.len()
        );

        Ok(())
    }

    /// Disconnect recipients whose queue failed, until none are left
    ///
    /// Each disconnect broadcasts, which can fail further recipients.
    fn reap_failed(&mut self) {
        while !self.failed.is_empty() {
            for connection_id in std::mem::take(&mut self.failed) {
                warn!("Disconnecting unreachable connection {}", connection_id);
                if let Err(e) = self.on_disconnect(connection_id) {
                    debug!("Failed to reap {}: {}", connection_id, e);
                }
            }
        }
    }

    /// Helper: nickname of a joined connection
    fn joined_nickname(&self, connection_id: ConnectionId) -> Result<String, HubError> {
        let conn = self
            .connections
            .get(&connection_id)
            .ok_or(HubError::ConnectionClosed)?;

        match conn.state() {
            ConnectionState::Closed => Err(HubError::ConnectionClosed),
            ConnectionState::PendingJoin => Err(HubError::NotJoined),
            ConnectionState::Joined => self
                .registry
                .get(connection_id)
                .map(|p| p.nickname.clone())
                .ok_or(HubError::NotJoined),
        }
    }

    /// Helper: send to one connection
    fn unicast(&mut self, connection_id: ConnectionId, msg: ServerMessage) {
        let Some(conn) = self.connections.get_mut(&connection_id) else {
            return;
        };

        if let Err(e) = conn.send(msg) {
            warn!("Send to {} failed: {}", connection_id, e);
            self.failed.push(connection_id);
        }
    }

    /// Helper: send to every joined connection, optionally skipping one
    ///
    /// A failing recipient is queued for disconnect and never stops
    /// delivery to the others.
    fn broadcast(&mut self, msg: ServerMessage, exclude: Option<ConnectionId>) {
        let recipients = self
            .connections
            .values_mut()
            .filter(|conn| conn.is_joined() && Some(conn.id) != exclude);

        for conn in recipients {
            if let Err(e) = conn.send(msg.clone()) {
                warn!("Broadcast to {} failed: {}", conn.id, e);
                self.failed.push(conn.id);
            }
        }
    }

    /// Helper: broadcast the current roster
    fn broadcast_users(&mut self) {
        let users = self.registry.roster();
        let count = users.len();
        self.broadcast(ServerMessage::Users { users, count }, None);
    }
}
