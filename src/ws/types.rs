//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// Upwingo SocketCluster host
pub const UPWINGO_WS_HOST: &str = "wss://ws.upwingo.com";

/// Upwingo SocketCluster port
pub const UPWINGO_WS_PORT: u16 = 443;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Give up on the opening handshake after this long
    pub connect_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self::socketcluster(UPWINGO_WS_HOST, UPWINGO_WS_PORT)
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Config for a SocketCluster endpoint at `host:port`
    pub fn socketcluster(host: &str, port: u16) -> Self {
        Self::new(format!(
            "{}:{}/socketcluster/",
            host.trim_end_matches('/'),
            port
        ))
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }
}

/// Streaming transport errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not open or keep the connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Writing a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// Server closed the stream without a close frame
    #[error("Stream ended unexpectedly")]
    StreamEnded,
}
