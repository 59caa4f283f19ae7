//! Participant registry
//!
//! Source of truth for presence: which connections have joined, under
//! what nickname, and when. Kept in join order so roster snapshots are
//! stable across broadcasts.

use chrono::{DateTime, Local};

use crate::message::UserEntry;
use crate::time::format_time;
use crate::types::ConnectionId;

/// A joined participant
///
/// Nicknames are not unique; `connection_id` is the only key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub joined_at: DateTime<Local>,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, nickname: String, joined_at: DateTime<Local>) -> Self {
        Self {
            connection_id,
            nickname,
            joined_at,
        }
    }

    /// Roster entry for the `users` event
    pub fn to_user_entry(&self) -> UserEntry {
        UserEntry {
            nickname: self.nickname.clone(),
            joined_at: format_time(&self.joined_at),
        }
    }
}

/// Join-ordered set of participants
#[derive(Debug, Default)]
pub struct Registry {
    participants: Vec<Participant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a participant
    ///
    /// Returns false, leaving the registry untouched, if the connection is
    /// already registered.
    pub fn insert(&mut self, participant: Participant) -> bool {
        if self.contains(participant.connection_id) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Remove a participant by connection, if present
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.connection_id == connection_id)?;
        Some(self.participants.remove(index))
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.get(connection_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Roster snapshot in join order
    pub fn roster(&self) -> Vec<UserEntry> {
        self.participants.iter().map(Participant::to_user_entry).collect()
    }
}
