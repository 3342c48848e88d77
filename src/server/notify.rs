//! Notification sink between the server core and its presentation layer

use crate::types::ServerEvent;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Receives operator-facing notifications from the server core.
///
/// The core reports through this trait instead of rendering anything itself;
/// implementations decide how lines reach the operator (structured logs, a
/// UI channel, a test harness).
pub trait NotificationSink: Send + Sync {
    /// An operational log line
    fn log(&self, text: &str);
    /// A chat message that was fanned out to clients
    fn chat_message(&self, text: &str);
    /// The connected-client count changed
    fn client_count_changed(&self, count: usize);
    /// A connection could not be established
    fn connect_error(&self, text: &str);
}

/// Sink that forwards notifications to the `tracing` subscriber.
///
/// The default choice for the headless server binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn log(&self, text: &str) {
        info!(target: "chathub::server", "{}", text);
    }

    fn chat_message(&self, text: &str) {
        info!(target: "chathub::chat", "{}", text);
    }

    fn client_count_changed(&self, count: usize) {
        info!(target: "chathub::server", "connected clients: {}", count);
    }

    fn connect_error(&self, text: &str) {
        error!(target: "chathub::server", "{}", text);
    }
}

/// Sink that delivers typed [`ServerEvent`]s over an unbounded channel.
///
/// Used by embedders that drive their own display, and by tests.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ChannelSink {
    /// Creates the sink together with the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ServerEvent) {
        // a dropped receiver means the presentation layer shut down first;
        // the core keeps running regardless
        let _ = self.tx.send(event);
    }
}

impl NotificationSink for ChannelSink {
    fn log(&self, text: &str) {
        self.emit(ServerEvent::Log(text.to_string()));
    }

    fn chat_message(&self, text: &str) {
        self.emit(ServerEvent::ChatMessage(text.to_string()));
    }

    fn client_count_changed(&self, count: usize) {
        self.emit(ServerEvent::ClientCountChanged(count));
    }

    fn connect_error(&self, text: &str) {
        self.emit(ServerEvent::ConnectError(text.to_string()));
    }
}
