//! Configuration structures for ChatHub

use crate::{ChatHubError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server settings
    pub server: ServerSettings,
}

/// Core server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind the accepting socket on
    pub bind_address: String,
    /// TCP port to listen on (0 picks an ephemeral port)
    pub port: u16,
}

impl ServerSettings {
    /// Socket address string suitable for `TcpListener::bind`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host to connect to
    pub server_address: String,
    /// Server TCP port
    pub port: u16,
    /// Display name announced during the handshake
    pub username: String,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl ClientConfig {
    /// Socket address string suitable for `TcpStream::connect`
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "0.0.0.0".to_string(),
                port: 12345,
            },
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            port: 12345,
            username: "anonymous".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ChatHubError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = toml::from_str(&content)
            .map_err(|e| ChatHubError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(ChatHubError::Config("Bind address cannot be empty".to_string()));
        }
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(ChatHubError::Config(format!(
                "Invalid bind address: {}",
                self.server.bind_address
            )));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_address.is_empty() {
            return Err(ChatHubError::Config("Server address cannot be empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(ChatHubError::Config("Username cannot be empty".to_string()));
        }
        Ok(())
    }
}
