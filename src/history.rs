//! History buffer
//!
//! Bounded log of recent chat messages replayed to new joiners.
//! Insertion order, chronological order and eviction order are the same.

use std::collections::VecDeque;

use crate::message::ChatMessage;

/// Default number of messages retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` messages
    ///
    /// A capacity of zero retains nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest ones beyond capacity
    pub fn push(&mut self, message: ChatMessage) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
