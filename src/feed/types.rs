//! Price feed types

use crate::cache::PriceRecord;
use crate::telemetry::DiscardReason;
use crate::ws::WsError;
use thiserror::Error;

/// A single validated tick, ready to upsert
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    /// Uppercase symbol (e.g., "AAPL.US")
    pub symbol: String,
    /// Record to store under `symbol`
    pub record: PriceRecord,
}

/// Reasons an inbound message does not yield a tick
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    /// Payload does not start with `{` (acknowledgements, keepalives)
    #[error("Not a JSON object")]
    NotJson,
    /// Looked like JSON but failed to parse
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    /// No `s` field, or an empty one
    #[error("Missing symbol")]
    MissingSymbol,
    /// No `p` field
    #[error("Missing price")]
    MissingPrice,
    /// `p` is not a finite number
    #[error("Invalid price")]
    InvalidPrice,
}

impl TickError {
    /// Metric label for this discard
    pub fn reason(&self) -> DiscardReason {
        match self {
            TickError::NotJson => DiscardReason::NotJson,
            TickError::InvalidJson(_) => DiscardReason::Malformed,
            TickError::MissingSymbol | TickError::MissingPrice | TickError::InvalidPrice => {
                DiscardReason::Incomplete
            }
        }
    }
}

/// Feed manager errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Endpoint URL could not be built from the base URL
    #[error("Invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Nothing to subscribe to
    #[error("Watch-list is empty")]
    EmptyWatchList,
    /// Connection task no longer running
    #[error(transparent)]
    Ws(#[from] WsError),
    /// Message loop task panicked or was aborted
    #[error("Feed task failed: {0}")]
    TaskFailed(String),
}
