//! Per-connection session state and I/O

use crate::{ChatHubError, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Why a session's read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Peer closed the connection
    Eof,
    /// A read failed (broken stream, invalid UTF-8)
    Error,
    /// The session was force-closed locally
    Cancelled,
}

/// Server-side state and I/O for one connected client.
///
/// A session knows nothing about other sessions; fan-out is the broadcaster's
/// job. The read half is handed to the owning task at construction, the write
/// half stays here behind a mutex so deliveries from other tasks serialize.
pub struct Session {
    id: Uuid,
    peer_addr: SocketAddr,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    name: parking_lot::Mutex<Option<String>>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl Session {
    /// Splits `stream` into the session and the buffered read half for the
    /// task that will run its handshake and read loop.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> (Self, BufReader<OwnedReadHalf>) {
        let (read_half, write_half) = stream.into_split();
        let session = Self {
            id: Uuid::new_v4(),
            peer_addr,
            writer: tokio::sync::Mutex::new(Some(write_half)),
            name: parking_lot::Mutex::new(None),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        };
        (session, BufReader::new(read_half))
    }

    /// Connection identity, stable for the session's lifetime
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Peer address as reported at accept time
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Display name, once the handshake established one
    pub fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reads the single handshake line: the client's display name.
    ///
    /// Returns `None` if the stream ends, errors, or is force-closed before a
    /// non-empty name arrives. A session that never obtained a name must not
    /// be announced with join/leave broadcasts.
    pub async fn handshake(&self, reader: &mut BufReader<OwnedReadHalf>) -> Option<String> {
        let mut line = String::new();
        tokio::select! {
            result = reader.read_line(&mut line) => match result {
                Ok(0) => None,
                Ok(_) => {
                    let name = line.trim();
                    if name.is_empty() {
                        None
                    } else {
                        let name = name.to_string();
                        *self.name.lock() = Some(name.clone());
                        Some(name)
                    }
                }
                Err(e) => {
                    debug!(session = %self.id, "handshake read failed: {}", e);
                    None
                }
            },
            _ = self.cancel.cancelled() => None,
        }
    }

    /// Runs the line-ingestion loop, handing each complete line (terminator
    /// stripped) to `on_line`. Ends on EOF, read error, or forced close.
    pub async fn read_loop<F, Fut>(
        &self,
        reader: &mut BufReader<OwnedReadHalf>,
        mut on_line: F,
    ) -> ReadOutcome
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                result = reader.read_line(&mut line) => match result {
                    Ok(0) => return ReadOutcome::Eof,
                    Ok(_) => on_line(line.trim_end_matches(['\r', '\n']).to_string()).await,
                    Err(e) => {
                        debug!(session = %self.id, "read failed: {}", e);
                        return ReadOutcome::Error;
                    }
                },
                _ = self.cancel.cancelled() => return ReadOutcome::Cancelled,
            }
        }
    }

    /// Writes one line plus terminator to the peer.
    ///
    /// Fails with a connection error once the session is closed; a delivery
    /// racing a close sees that error instead of a broken write.
    pub async fn send(&self, text: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| ChatHubError::Connection(format!("session {} is closed", self.id)))?;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Closes the session: cancels any blocked read and shuts the stream
    /// down. Calling it again, or after the peer already vanished, is a
    /// no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(session = %self.id, "shutdown failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    async fn tcp_pair() -> (TcpStream, SocketAddr, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accepted, connected) = tokio::join!(listener.accept(), TcpStream::connect(addr));
        let (server_stream, peer_addr) = accepted.unwrap();
        (server_stream, peer_addr, connected.unwrap())
    }

    #[tokio::test]
    async fn test_handshake_reads_display_name() {
        let (server_stream, peer_addr, mut client) = tcp_pair().await;
        let (session, mut reader) = Session::new(server_stream, peer_addr);

        client.write_all(b"alice\r\n").await.unwrap();

        let name = session.handshake(&mut reader).await;
        assert_eq!(name.as_deref(), Some("alice"));
        assert_eq!(session.name().as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_handshake_returns_none_on_eof() {
        let (server_stream, peer_addr, client) = tcp_pair().await;
        let (session, mut reader) = Session::new(server_stream, peer_addr);

        drop(client);

        let name = session.handshake(&mut reader).await;
        assert!(name.is_none());
        assert!(session.name().is_none());
    }

    #[tokio::test]
    async fn test_handshake_rejects_blank_name() {
        let (server_stream, peer_addr, mut client) = tcp_pair().await;
        let (session, mut reader) = Session::new(server_stream, peer_addr);

        client.write_all(b"   \n").await.unwrap();

        let name = session.handshake(&mut reader).await;
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_send_appends_line_terminator() {
        let (server_stream, peer_addr, mut client) = tcp_pair().await;
        let (session, _reader) = Session::new(server_stream, peer_addr);

        session.send("bob joined the chat").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"bob joined the chat\n");
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (server_stream, peer_addr, _client) = tcp_pair().await;
        let (session, _reader) = Session::new(server_stream, peer_addr);

        session.close().await;

        let result = session.send("too late").await;
        assert!(matches!(result, Err(ChatHubError::Connection(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (server_stream, peer_addr, _client) = tcp_pair().await;
        let (session, _reader) = Session::new(server_stream, peer_addr);

        session.close().await;
        session.close().await;
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_read_loop_delivers_lines_until_eof() {
        let (server_stream, peer_addr, mut client) = tcp_pair().await;
        let (session, mut reader) = Session::new(server_stream, peer_addr);

        client.write_all(b"one\ntwo\r\nthree\n").await.unwrap();
        drop(client);

        let mut lines = Vec::new();
        let outcome = session
            .read_loop(&mut reader, |line| {
                lines.push(line);
                std::future::ready(())
            })
            .await;

        assert_eq!(outcome, ReadOutcome::Eof);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_close_cancels_blocked_read_loop() {
        let (server_stream, peer_addr, _client) = tcp_pair().await;
        let (session, mut reader) = Session::new(server_stream, peer_addr);
        let session = Arc::new(session);

        let looper = Arc::clone(&session);
        let handle = tokio::spawn(async move {
            looper
                .read_loop(&mut reader, |_line| std::future::ready(()))
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        session.close().await;

        let outcome = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(outcome, ReadOutcome::Cancelled);
    }
}
