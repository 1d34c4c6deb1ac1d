//! Prometheus metrics

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks written to the cache
    TicksReceived,
    /// Reconnect attempts scheduled
    Reconnects,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// 1 while the upstream connection is open
    ConnectionOpen,
    /// Distinct symbols in the cache
    CachedSymbols,
}

/// Why an inbound message did not reach the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Acknowledgement or other non-JSON payload
    NotJson,
    /// JSON that failed to parse
    Malformed,
    /// Parsed but lacking a usable symbol or price
    Incomplete,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::NotJson => "not_json",
            DiscardReason::Malformed => "malformed",
            DiscardReason::Incomplete => "incomplete",
        }
    }
}

const TICKS_TOTAL: &str = "price_relay_ticks_total";
const RECONNECTS_TOTAL: &str = "price_relay_reconnects_total";
const DISCARDED_TOTAL: &str = "price_relay_messages_discarded_total";
const CONNECTION_OPEN: &str = "price_relay_connection_open";
const CACHED_SYMBOLS: &str = "price_relay_cached_symbols";

/// Install the Prometheus recorder and its HTTP listener
///
/// Without a recorder the recording functions below are no-ops, which is
/// what tests and one-shot commands rely on.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    describe_counter!(TICKS_TOTAL, "Price ticks written to the cache");
    describe_counter!(RECONNECTS_TOTAL, "Upstream reconnect attempts scheduled");
    describe_counter!(DISCARDED_TOTAL, "Inbound messages dropped, by reason");
    describe_gauge!(CONNECTION_OPEN, "1 while the upstream connection is open");
    describe_gauge!(CACHED_SYMBOLS, "Distinct symbols held in the price cache");

    tracing::info!(port, "Metrics exporter listening");
    Ok(())
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::TicksReceived => TICKS_TOTAL,
        CounterMetric::Reconnects => RECONNECTS_TOTAL,
    };

    counter!(metric_name).increment(1);
}

/// Count a discarded inbound message
pub fn record_discard(reason: DiscardReason) {
    counter!(DISCARDED_TOTAL, "reason" => reason.as_str()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::ConnectionOpen => CONNECTION_OPEN,
        GaugeMetric::CachedSymbols => CACHED_SYMBOLS,
    };

    gauge!(metric_name).set(value);
}
