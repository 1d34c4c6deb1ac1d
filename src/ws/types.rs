//! WebSocket types and configuration

use super::ReconnectConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Reconnection policy applied after every close or failed attempt
    pub reconnect: ReconnectConfig,
    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,
    /// Interval for sending ping frames
    pub ping_interval: Duration,
    /// Timeout for pong response
    pub pong_timeout: Duration,
    /// Text frames written right after every successful connect
    pub on_connect: Vec<String>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect: ReconnectConfig::default(),
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            on_connect: Vec::new(),
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the reconnection policy
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the connection attempt timeout
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    /// Set pong timeout
    pub fn pong_timeout(mut self, d: Duration) -> Self {
        self.pong_timeout = d;
        self
    }

    /// Queue a text frame to send on every (re)connect
    pub fn on_connect(mut self, message: impl Into<String>) -> Self {
        self.on_connect.push(message.into());
        self
    }
}

/// Socket lifecycle as seen from outside the connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection has been attempted yet
    #[default]
    Uninitialized,
    /// Connection attempt in flight
    Connecting,
    /// Connected and streaming
    Open,
    /// Close handshake initiated locally
    Closing,
    /// No live connection (waiting to reconnect or stopped)
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the connection task, in arrival order
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Connection established and on-connect frames written
    Connected { connection_id: Uuid },
    /// Connection ended; no further frames from `connection_id` will follow
    Disconnected {
        connection_id: Uuid,
        code: Option<u16>,
        reason: String,
    },
    /// Transport error on a live connection or a failed attempt
    Error(WsError),
    /// Next attempt scheduled after `delay`
    Reconnecting { attempt: u32, delay: Duration },
}

/// Commands accepted by a running connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsCommand {
    /// Drop the current connection (closing it if open) and connect again now
    Reconnect,
    /// Close the current connection and stop the task
    Shutdown,
}

/// WebSocket errors
#[derive(Debug, Clone, Error)]
pub enum WsError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Connection attempt did not complete in time
    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// No pong within the configured timeout
    #[error("Pong timeout")]
    PongTimeout,
    /// Connection task is gone
    #[error("Channel closed")]
    ChannelClosed,
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
    /// Peer stopped draining the socket
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),
}
