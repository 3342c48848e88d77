//! ChatHub server implementation

pub mod broadcast;
pub mod notify;
pub mod registry;
pub mod session;

use crate::config::ServerConfig;
use crate::{ChatHubError, Result};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use broadcast::Broadcaster;
pub use notify::{ChannelSink, NotificationSink, TracingSink};
pub use registry::Registry;
pub use session::{ReadOutcome, Session};

/// Server lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No accepting socket; the idle state
    Stopped,
    /// `start` is binding the listener
    Starting,
    /// Accept loop running
    Running,
    /// `stop` is tearing sessions down
    Stopping,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Stopped => write!(f, "stopped"),
            Lifecycle::Starting => write!(f, "starting"),
            Lifecycle::Running => write!(f, "running"),
            Lifecycle::Stopping => write!(f, "stopping"),
        }
    }
}

/// Everything the accept loop and session tasks need, clonable per task.
#[derive(Clone)]
struct Shared {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    sink: Arc<dyn NotificationSink>,
}

struct AcceptTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The chat hub: accept loop, session lifecycle, and the operator surface.
///
/// `start`, `stop`, and [`broadcast_operator_message`](Self::broadcast_operator_message)
/// are the only operations the presentation layer drives; everything the
/// operator would see flows back through the [`NotificationSink`].
pub struct ChatServer {
    config: ServerConfig,
    shared: Shared,
    state: parking_lot::Mutex<Lifecycle>,
    local_addr: parking_lot::Mutex<Option<SocketAddr>>,
    accept_task: parking_lot::Mutex<Option<AcceptTask>>,
}

impl ChatServer {
    /// Creates a server reporting through `sink`. No I/O happens until
    /// [`start`](Self::start).
    pub fn new(config: ServerConfig, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(Registry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry), Arc::clone(&sink));

        Ok(Self {
            config,
            shared: Shared {
                registry,
                broadcaster,
                sink,
            },
            state: parking_lot::Mutex::new(Lifecycle::Stopped),
            local_addr: parking_lot::Mutex::new(None),
            accept_task: parking_lot::Mutex::new(None),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> Lifecycle {
        *self.state.lock()
    }

    /// Number of currently registered sessions
    pub fn client_count(&self) -> usize {
        self.shared.registry.count()
    }

    /// Address the accepting socket is bound on, while running. This is how
    /// embedders discover the actual port when the configured port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Binds the listening socket and spawns the accept loop.
    ///
    /// Fails fast if the server is not stopped, so two concurrent `start`
    /// calls can never open two accepting sockets. A bind failure is
    /// reported to the sink and reverts the state to stopped.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != Lifecycle::Stopped {
                return Err(ChatHubError::Server(format!("cannot start while {}", *state)));
            }
            *state = Lifecycle::Starting;
        }

        let bind_addr = self.config.server.listen_addr();
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                *self.state.lock() = Lifecycle::Stopped;
                let text = format!("failed to bind {}: {}", bind_addr, e);
                self.shared.sink.connect_error(&text);
                return Err(ChatHubError::Server(text));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                *self.state.lock() = Lifecycle::Stopped;
                return Err(e.into());
            }
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::accept_loop(
            listener,
            self.shared.clone(),
            cancel.clone(),
        ));
        *self.accept_task.lock() = Some(AcceptTask { cancel, handle });
        *self.local_addr.lock() = Some(local_addr);
        *self.state.lock() = Lifecycle::Running;

        self.shared
            .sink
            .log(&format!("server started on port {}", local_addr.port()));
        Ok(())
    }

    /// Stops the server: ends the accept loop, force-closes every registered
    /// session, and returns to the stopped state. A no-op unless running;
    /// safe to call from any task.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state != Lifecycle::Running {
                return;
            }
            *state = Lifecycle::Stopping;
        }

        let accept = self.accept_task.lock().take();
        if let Some(task) = &accept {
            task.cancel.cancel();
        }

        for session in self.shared.registry.drain() {
            session.close().await;
        }
        self.shared.sink.client_count_changed(0);

        if let Some(task) = accept {
            let _ = task.handle.await;
        }
        // a connection that won the accept race during teardown is
        // registered but must not outlive the server
        for session in self.shared.registry.drain() {
            session.close().await;
        }

        *self.local_addr.lock() = None;
        *self.state.lock() = Lifecycle::Stopped;
        self.shared.sink.log("server stopped");
    }

    /// Broadcasts an operator message to every connected session as
    /// `"Server: <text>"`. Blank input is dropped.
    pub async fn broadcast_operator_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.shared
            .broadcaster
            .broadcast(&format!("Server: {}", text), None)
            .await;
    }

    async fn accept_loop(listener: TcpListener, shared: Shared, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = listener.accept() => match result {
                    Ok((stream, peer_addr)) => {
                        let (session, reader) = Session::new(stream, peer_addr);
                        let session = Arc::new(session);
                        shared.registry.add(Arc::clone(&session));
                        shared.sink.client_count_changed(shared.registry.count());

                        let shared = shared.clone();
                        tokio::spawn(async move {
                            Self::run_session(shared, session, reader).await;
                        });
                    }
                    Err(e) => {
                        // a failed accept caused by a concurrent stop is not
                        // worth reporting
                        if !cancel.is_cancelled() {
                            shared.sink.log(&format!("accept error: {}", e));
                        }
                    }
                },
            }
        }
        // dropping the listener here releases the port
    }

    async fn run_session(
        shared: Shared,
        session: Arc<Session>,
        mut reader: BufReader<OwnedReadHalf>,
    ) {
        let name = match session.handshake(&mut reader).await {
            Some(name) => name,
            None => {
                // never obtained a name, so there is nothing to announce
                session.close().await;
                shared.registry.remove(session.id());
                shared.sink.client_count_changed(shared.registry.count());
                shared.sink.log(&format!(
                    "{} disconnected before introducing itself",
                    session.peer_addr()
                ));
                return;
            }
        };

        shared
            .sink
            .log(&format!("{} connected from {}", name, session.peer_addr()));
        shared
            .broadcaster
            .broadcast(&format!("{} joined the chat", name), Some(session.id()))
            .await;

        let outcome = session
            .read_loop(&mut reader, |line| {
                let broadcaster = shared.broadcaster.clone();
                let text = format!("{}: {}", name, line);
                let exclude = session.id();
                async move { broadcaster.broadcast(&text, Some(exclude)).await }
            })
            .await;

        match outcome {
            ReadOutcome::Error => shared.sink.log(&format!("{} disconnected: read error", name)),
            _ => shared.sink.log(&format!("{} disconnected", name)),
        }

        session.close().await;
        shared.registry.remove(session.id());
        shared.sink.client_count_changed(shared.registry.count());
        shared
            .broadcaster
            .broadcast(&format!("{} left the chat", name), Some(session.id()))
            .await;
    }
}
