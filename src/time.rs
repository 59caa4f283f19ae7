//! Server clock with an abstraction for testability.
//!
//! Every timestamp on the wire is assigned by the hub from this clock,
//! never taken from the client.

use chrono::{DateTime, Local};

/// Wire format for all timestamps (`welcome`, `message`, `system`, `joined_at`)
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Clock trait for dependency injection and testing
pub trait Clock: Send {
    /// Current server local time
    fn now(&self) -> DateTime<Local>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Local>,
}

impl FixedClock {
    pub fn new(fixed_time: DateTime<Local>) -> Self {
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.fixed_time
    }
}

/// Format a time the way it appears on the wire
pub fn format_time(time: &DateTime<Local>) -> String {
    time.format(TIME_FORMAT).to_string()
}
