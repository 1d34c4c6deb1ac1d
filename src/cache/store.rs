//! Concurrent symbol → price store

use super::PriceRecord;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache handle shared between the feed manager and the HTTP layer
pub type SharedPriceCache = Arc<PriceCache>;

/// Normalize a symbol to its cache key form ("AAPL.US")
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.to_uppercase()
}

/// Latest-value store keyed by uppercase symbol
///
/// Writers hold the lock only for the insert itself.
#[derive(Debug, Default)]
pub struct PriceCache {
    records: RwLock<HashMap<String, PriceRecord>>,
}

impl PriceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache ready to be shared
    pub fn shared() -> SharedPriceCache {
        Arc::new(Self::new())
    }

    /// Insert or replace the record for a symbol
    pub fn upsert(&self, symbol: &str, record: PriceRecord) {
        let key = normalize_symbol(symbol);
        self.records.write().insert(key, record);
    }

    /// Latest record for a symbol, case-insensitive
    pub fn get(&self, symbol: &str) -> Option<PriceRecord> {
        let key = normalize_symbol(symbol);
        self.records.read().get(&key).copied()
    }

    /// Number of distinct symbols held
    pub fn size(&self) -> usize {
        self.records.read().len()
    }
}
