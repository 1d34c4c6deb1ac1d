//! Shared view of the connection lifecycle

use super::ConnectionState;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, read-mostly cell holding the current [`ConnectionState`]
///
/// Only the connection task writes it; health probes read it.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    inner: Arc<RwLock<ConnectionState>>,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn get(&self) -> ConnectionState {
        *self.inner.read()
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.inner.write(), state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
        }
    }
}
