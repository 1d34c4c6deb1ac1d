//! EODHD websocket protocol: endpoints, subscribe request, tick parsing

use super::{FeedError, PriceTick, TickError};
use crate::cache::{normalize_symbol, PriceRecord, RecordType};
use reqwest::Url;
use serde::Deserialize;

/// EODHD WebSocket base URL
pub const EODHD_WS_URL: &str = "wss://ws.eodhistoricaldata.com/ws";

/// Subscribable endpoints whose ticks carry a `p` price field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum FeedEndpoint {
    /// US trades (`/ws/us`)
    #[default]
    #[serde(rename = "us")]
    UsTrade,
    /// Crypto trades (`/ws/crypto`)
    #[serde(rename = "crypto")]
    Crypto,
}

impl FeedEndpoint {
    /// Path segment under the base URL
    pub fn path(&self) -> &'static str {
        match self {
            FeedEndpoint::UsTrade => "us",
            FeedEndpoint::Crypto => "crypto",
        }
    }

    /// Record type every tick from this endpoint is tagged with
    pub fn record_type(&self) -> RecordType {
        match self {
            FeedEndpoint::UsTrade => RecordType::Trade,
            FeedEndpoint::Crypto => RecordType::Crypto,
        }
    }
}

/// Tick message fields used by the relay
///
/// Trade ticks look like `{"s":"AAPL","p":189.5,"v":100,"t":1700000000000}`;
/// crypto ticks send the price as a string.
#[derive(Debug, Deserialize)]
struct EodhdTickMessage {
    /// Symbol
    #[serde(rename = "s")]
    symbol: Option<String>,
    /// Price
    #[serde(rename = "p")]
    price: Option<Numeric>,
    /// Event time (milliseconds)
    #[serde(rename = "t")]
    timestamp: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Int(v) => Some(*v as f64),
            Numeric::Float(v) => Some(*v),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_millis(&self) -> Option<i64> {
        match self {
            Numeric::Int(v) => Some(*v),
            Numeric::Float(v) if v.is_finite() => Some(*v as i64),
            Numeric::Float(_) => None,
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Build the endpoint URL carrying the API token
pub fn endpoint_url(
    base_url: &str,
    endpoint: FeedEndpoint,
    api_key: &str,
) -> Result<String, FeedError> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), endpoint.path());
    let url = Url::parse_with_params(&raw, &[("api_token", api_key)]).map_err(|e| {
        FeedError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        }
    })?;
    Ok(url.into())
}

/// Subscribe request for a watch-list, e.g.
/// `{"action":"subscribe","symbols":"AAPL.US,MSFT.US"}`
pub fn subscribe_message(symbols: &[String]) -> String {
    let joined = symbols
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    serde_json::json!({
        "action": "subscribe",
        "symbols": joined,
    })
    .to_string()
}

/// Parse one inbound payload into a tick
///
/// `now_ms` is used when the message carries no usable `t`.
pub fn parse_tick(
    msg: &str,
    record_type: RecordType,
    now_ms: i64,
) -> Result<PriceTick, TickError> {
    if !msg.starts_with('{') {
        return Err(TickError::NotJson);
    }

    let tick: EodhdTickMessage =
        serde_json::from_str(msg).map_err(|e| TickError::InvalidJson(e.to_string()))?;

    let symbol = tick
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or(TickError::MissingSymbol)?;
    let price = tick
        .price
        .ok_or(TickError::MissingPrice)?
        .as_f64()
        .filter(|p| p.is_finite())
        .ok_or(TickError::InvalidPrice)?;
    // t = 0 is treated as missing
    let timestamp = tick
        .timestamp
        .and_then(|t| t.as_millis())
        .filter(|t| *t > 0)
        .unwrap_or(now_ms);

    Ok(PriceTick {
        symbol: normalize_symbol(&symbol),
        record: PriceRecord::new(price, timestamp, record_type),
    })
}
