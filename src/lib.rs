//! Multi-participant WebSocket Chat Hub Library
//!
//! A WebSocket chat relay built with tokio-tungstenite using the Actor
//! pattern for state management.
//!
//! # Features
//! - Nickname join with welcome message
//! - Bounded history replay for new participants
//! - Presence roster broadcast on every join and leave
//! - Real-time chat fan-out with server-assigned timestamps
//! - Typing indicators
//! - Disconnection handling, including unreachable recipients
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Hub` is the central actor owning the registry, history and typing state
//! - Each connection has a `handler` task communicating with the hub
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_hub::{serve, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(config.bind_addr()).await.unwrap();
//!     serve(listener, config).await;
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod history;
pub mod hub;
pub mod message;
pub mod registry;
pub mod server;
pub mod time;
pub mod types;
pub mod typing;

// Re-export main types for convenience
pub use config::Config;
pub use connection::{Connection, ConnectionState};
pub use error::{AppError, HubError, SendError};
pub use handler::handle_connection;
pub use history::HistoryBuffer;
pub use hub::{Hub, HubCommand};
pub use message::{ChatMessage, ClientMessage, ServerMessage, UserEntry};
pub use registry::{Participant, Registry};
pub use server::serve;
pub use time::{Clock, FixedClock, SystemClock};
pub use types::ConnectionId;
pub use typing::TypingTracker;
