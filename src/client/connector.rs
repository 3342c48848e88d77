//! Headless connector between a chat presentation layer and the wire

use crate::config::ClientConfig;
use crate::{ChatHubError, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Stream of lines arriving from the server, terminators stripped.
pub type IncomingLines = mpsc::UnboundedReceiver<String>;

/// Thin chat client: sends typed lines to the server and forwards received
/// lines to a channel. Rendering is somebody else's problem.
///
/// The display-name handshake happens during connect, so a connected client
/// is already announced to the room.
#[derive(Clone)]
pub struct ChatClient {
    config: ClientConfig,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

impl ChatClient {
    /// Connects to the server at `server_address:port`, announcing
    /// `username`, and returns the client plus the stream of incoming lines.
    pub async fn connect(
        server_address: &str,
        port: u16,
        username: &str,
    ) -> Result<(Self, IncomingLines)> {
        let config = ClientConfig {
            server_address: server_address.to_string(),
            port,
            username: username.to_string(),
            ..Default::default()
        };

        Self::with_config(config).await
    }

    /// Connects with a custom configuration.
    pub async fn with_config(config: ClientConfig) -> Result<(Self, IncomingLines)> {
        config.validate()?;

        let connect_future = TcpStream::connect(config.server_addr());
        let stream = timeout(Duration::from_secs(config.timeout_seconds), connect_future)
            .await
            .map_err(|_| ChatHubError::Connection("Connection timeout".to_string()))?
            .map_err(|e| ChatHubError::Connection(format!("Failed to connect: {}", e)))?;

        let (read_half, mut write_half) = stream.into_split();

        // the first line on the wire is the display name
        write_half.write_all(config.username.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        write_half.flush().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::pump_incoming(read_half, tx));

        let client = Self {
            config,
            writer: Arc::new(Mutex::new(Some(write_half))),
        };
        Ok((client, rx))
    }

    /// Display name announced at connect time
    pub fn username(&self) -> &str {
        &self.config.username
    }

    /// Sends one chat line to the server.
    pub async fn send(&self, text: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| ChatHubError::Connection("Client is closed".to_string()))?;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Closes the connection to the server. The incoming-line channel ends
    /// once the server observes the disconnect.
    pub async fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.shutdown().await.map_err(ChatHubError::Io)?;
        }
        Ok(())
    }

    async fn pump_incoming(read_half: OwnedReadHalf, tx: mpsc::UnboundedSender<String>) {
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let delivered = tx.send(line.trim_end_matches(['\r', '\n']).to_string());
                    if delivered.is_err() {
                        // embedder dropped the receiver; stop pumping
                        break;
                    }
                }
                Err(e) => {
                    debug!("client read failed: {}", e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal stand-in for the hub: accepts one connection, records the
    /// handshake line, then echoes every received line back prefixed.
    async fn spawn_echo_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);

                let mut name = String::new();
                if reader.read_line(&mut name).await.unwrap_or(0) == 0 {
                    return;
                }
                let name = name.trim().to_string();

                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let reply = format!("{}: {}\n", name, line.trim_end());
                            if write_half.write_all(reply.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_connect_and_exchange_lines() {
        let addr = spawn_echo_server().await;

        let (client, mut incoming) = ChatClient::connect("127.0.0.1", addr.port(), "alice")
            .await
            .unwrap();
        assert_eq!(client.username(), "alice");

        client.send("hello").await.unwrap();
        let line = timeout(Duration::from_secs(1), incoming.recv())
            .await
            .expect("timed out")
            .expect("connection closed");
        assert_eq!(line, "alice: hello");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // bind and immediately drop a listener so the port is closed
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = ChatClient::connect("127.0.0.1", addr.port(), "alice").await;
        assert!(matches!(result, Err(ChatHubError::Connection(_))));
    }

    #[tokio::test]
    async fn test_rejects_blank_username() {
        let result = ChatClient::connect("127.0.0.1", 12345, "  ").await;
        assert!(matches!(result, Err(ChatHubError::Config(_))));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let addr = spawn_echo_server().await;
        let (client, _incoming) = ChatClient::connect("127.0.0.1", addr.port(), "bob")
            .await
            .unwrap();

        client.close().await.unwrap();
        // second close is a no-op
        client.close().await.unwrap();

        let result = client.send("anyone?").await;
        assert!(matches!(result, Err(ChatHubError::Connection(_))));
    }

    #[tokio::test]
    async fn test_incoming_channel_ends_on_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and drop: the client should observe EOF
            let _ = listener.accept().await;
        });

        let (_client, mut incoming) = ChatClient::connect("127.0.0.1", addr.port(), "carol")
            .await
            .unwrap();

        let end = timeout(Duration::from_secs(1), incoming.recv())
            .await
            .expect("timed out");
        assert!(end.is_none());
    }
}
