//! Price feed module
//!
//! Keeps one subscription to the EODHD websocket feed alive and writes every
//! valid tick into the shared price cache.

mod eodhd;
mod manager;
mod types;

pub use eodhd::{endpoint_url, parse_tick, subscribe_message, FeedEndpoint, EODHD_WS_URL};
pub use manager::{handle_text, FeedHandle, FeedManager};
pub use types::{FeedError, PriceTick, TickError};
