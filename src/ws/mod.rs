//! WebSocket client library
//!
//! Provides a reusable WebSocket client that owns a single connection at a
//! time, reconnects on every close or failure, and keeps a shared view of
//! the connection state.

mod client;
mod reconnect;
mod state;
mod types;

pub use client::{WsClient, WsControl};
pub use reconnect::{BackoffMode, ReconnectConfig, ReconnectPolicy};
pub use state::ConnectionStatus;
pub use types::{ConnectionState, WsCommand, WsConfig, WsError, WsMessage};
