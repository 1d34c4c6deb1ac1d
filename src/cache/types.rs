//! Price cache types

use serde::{Deserialize, Serialize};

/// Kind of tick a record was derived from, implied by the subscribed endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// US trade ticks
    Trade,
    /// US quote ticks
    Quote,
    /// Crypto ticks
    Crypto,
    /// Forex ticks
    Forex,
}

impl RecordType {
    /// Lowercase name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Trade => "trade",
            RecordType::Quote => "quote",
            RecordType::Crypto => "crypto",
            RecordType::Forex => "forex",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known price for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Last price
    pub price: f64,
    /// Tick time in epoch milliseconds
    pub timestamp: i64,
    /// Endpoint-implied record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
}

impl PriceRecord {
    pub fn new(price: f64, timestamp: i64, record_type: RecordType) -> Self {
        Self {
            price,
            timestamp,
            record_type,
        }
    }
}
