//! Latest-price cache
//!
//! Holds the most recent price per symbol. Written by the feed manager,
//! read concurrently by the HTTP layer.

mod store;
mod types;

pub use store::{normalize_symbol, PriceCache, SharedPriceCache};
pub use types::{PriceRecord, RecordType};
