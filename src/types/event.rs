//! Notification events emitted by the server core

use std::fmt;

/// A notification from the server core to its presentation layer.
///
/// The core never renders anything itself; everything an operator display
/// would show arrives as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Operational log line: startup, connects, accept errors
    Log(String),
    /// A chat line that was fanned out to clients
    ChatMessage(String),
    /// The number of connected clients changed
    ClientCountChanged(usize),
    /// A connection could not be established
    ConnectError(String),
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::Log(text) => write!(f, "[LOG] {}", text),
            ServerEvent::ChatMessage(text) => write!(f, "{}", text),
            ServerEvent::ClientCountChanged(n) => write!(f, "Connected Clients: {}", n),
            ServerEvent::ConnectError(text) => write!(f, "[ERROR] {}", text),
        }
    }
}
