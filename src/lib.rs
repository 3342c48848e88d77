//! # ChatHub - Line-Oriented TCP Chat Hub
//!
//! ChatHub is a small chat server: clients open a TCP connection, announce a
//! display name, and exchange newline-delimited messages that are fanned out
//! to every other connected client.
//!
//! ## Features
//!
//! - **Broadcast Fan-Out**: every chat line reaches all other clients
//! - **Async I/O**: one Tokio task per connection, no event-loop bottleneck
//! - **Operator Surface**: start/stop and server-wide announcements
//! - **Pluggable Notifications**: log lines, chat echoes, and client counts
//!   delivered through a sink trait instead of a baked-in display
//!
//! ## Quick Start
//!
//! ### Server
//! ```no_run
//! use chathub::config::ServerConfig;
//! use chathub::server::{ChatServer, TracingSink};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ChatServer::new(ServerConfig::default(), Arc::new(TracingSink))?;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ### Client
//! ```no_run
//! use chathub::client::ChatClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (client, mut incoming) = ChatClient::connect("127.0.0.1", 12345, "alice").await?;
//!
//!     client.send("hello everyone").await?;
//!     while let Some(line) = incoming.recv().await {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod server;
pub mod types;

/// Common error types used throughout ChatHub
pub mod error {
    use std::fmt;

    /// ChatHub error types
    #[derive(Debug)]
    pub enum ChatHubError {
        /// I/O operation failed
        Io(std::io::Error),
        /// Configuration error
        Config(String),
        /// Server error
        Server(String),
        /// Client error
        Client(String),
        /// Connection error
        Connection(String),
    }

    impl fmt::Display for ChatHubError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ChatHubError::Io(e) => write!(f, "I/O error: {}", e),
                ChatHubError::Config(e) => write!(f, "Configuration error: {}", e),
                ChatHubError::Server(e) => write!(f, "Server error: {}", e),
                ChatHubError::Client(e) => write!(f, "Client error: {}", e),
                ChatHubError::Connection(e) => write!(f, "Connection error: {}", e),
            }
        }
    }

    impl std::error::Error for ChatHubError {}

    impl From<std::io::Error> for ChatHubError {
        fn from(err: std::io::Error) -> Self {
            ChatHubError::Io(err)
        }
    }

    /// Result type alias for ChatHub operations
    pub type Result<T> = std::result::Result<T, ChatHubError>;
}

pub use error::{ChatHubError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{ChatClient, IncomingLines};
    pub use crate::config::{ClientConfig, ServerConfig};
    pub use crate::server::{ChannelSink, ChatServer, Lifecycle, NotificationSink, TracingSink};
    pub use crate::types::ServerEvent;
    pub use crate::{ChatHubError, Result};
}
