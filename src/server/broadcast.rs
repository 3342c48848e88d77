//! Message fan-out across registered sessions

use crate::server::{NotificationSink, Registry};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Delivers messages to every registered session and echoes each message
/// once to the notification sink.
///
/// Fan-out is fire-and-forget: no acknowledgement, no retry, at most one
/// delivery attempt per recipient. Messages from a single sender keep their
/// order (one reader task per session); interleaving across senders is
/// whatever order their broadcasts took the snapshot.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    sink: Arc<dyn NotificationSink>,
}

impl Broadcaster {
    /// Creates a broadcaster over `registry`, reporting to `sink`.
    pub fn new(registry: Arc<Registry>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { registry, sink }
    }

    /// Sends `text` to every session in the current snapshot except
    /// `exclude`.
    ///
    /// A recipient that fails is skipped; it will notice the broken stream
    /// on its own task and finalize there. After all delivery attempts the
    /// message is reported to the sink exactly once, however many sessions
    /// actually received it.
    pub async fn broadcast(&self, text: &str, exclude: Option<Uuid>) {
        for session in self.registry.snapshot() {
            if Some(session.id()) == exclude {
                continue;
            }
            if let Err(e) = session.send(text).await {
                debug!(session = %session.id(), "delivery failed: {}", e);
            }
        }
        self.sink.chat_message(text);
    }
}
