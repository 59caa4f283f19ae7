//! Server configuration
//!
//! Parsed from the command line with clap. `Default` mirrors the
//! command-line defaults for tests and embedding.

use clap::builder::RangedU64ValueParser;
use clap::Parser;

use crate::history::DEFAULT_HISTORY_CAPACITY;

#[derive(Parser, Debug, Clone)]
#[command(name = "chat_hub")]
#[command(about = "Multi-participant WebSocket chat hub", long_about = None)]
pub struct Config {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = 8080)]
    pub port: u16,

    /// Request path accepted for the WebSocket upgrade
    #[arg(long, default_value = "/ws")]
    pub path: String,

    /// Number of chat messages replayed to new participants
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    pub history_capacity: usize,

    /// Capacity of the queue from connections to the hub
    #[arg(long, default_value_t = 256, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub command_buffer: usize,
}

impl Config {
    /// Address to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            path: "/ws".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            command_buffer: 256,
        }
    }
}
