//! Thread-safe collection of active sessions

use crate::server::Session;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The set of currently connected sessions, keyed by session id.
///
/// One mutex guards the map. It is held only for the duration of a mutation
/// or snapshot copy, never across delivery I/O, so a stalled peer cannot
/// block registration or removal of unrelated sessions.
#[derive(Default)]
pub struct Registry {
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
}

impl Registry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session. Closed sessions are refused: a session that has
    /// already finalized must never become visible to broadcasts again.
    pub fn add(&self, session: Arc<Session>) {
        if session.is_closed() {
            debug!(session = %session.id(), "refusing to register closed session");
            return;
        }
        self.sessions.lock().insert(session.id(), session);
    }

    /// Removes a session by id. Absent ids are a no-op, so concurrent
    /// finalize paths may both call this.
    pub fn remove(&self, id: Uuid) {
        self.sessions.lock().remove(&id);
    }

    /// Point-in-time copy of the registered sessions, safe to iterate
    /// without holding the lock during delivery.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().values().cloned().collect()
    }

    /// Number of registered sessions. Display only; never used for a
    /// correctness decision.
    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Removes and returns every registered session (server stop path).
    pub fn drain(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().drain().map(|(_, session)| session).collect()
    }
}
