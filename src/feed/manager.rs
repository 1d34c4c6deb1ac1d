//! Feed connection manager
//!
//! Owns the upstream connection through [`WsClient`] and applies its events
//! to the price cache in arrival order.

use super::eodhd::{endpoint_url, parse_tick, subscribe_message};
use super::{FeedError, TickError};
use crate::cache::{PriceCache, RecordType, SharedPriceCache};
use crate::config::FeedConfig;
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use crate::ws::{ConnectionState, ConnectionStatus, WsClient, WsConfig, WsControl, WsMessage};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Supervises the single upstream subscription
pub struct FeedManager {
    client: WsClient,
    cache: SharedPriceCache,
    record_type: RecordType,
    symbols: Vec<String>,
}

impl FeedManager {
    /// Create a manager for the configured endpoint and watch-list
    pub fn new(
        config: &FeedConfig,
        api_key: &str,
        cache: SharedPriceCache,
    ) -> Result<Self, FeedError> {
        let symbols: Vec<String> = config
            .symbols
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(FeedError::EmptyWatchList);
        }

        let url = endpoint_url(&config.base_url, config.endpoint, api_key)?;
        let ws_config = WsConfig::new(url)
            .reconnect(config.reconnect_config())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .ping_interval(Duration::from_secs(config.ping_interval_secs.max(1)))
            .pong_timeout(Duration::from_secs(config.pong_timeout_secs))
            .on_connect(subscribe_message(&symbols));

        Ok(Self {
            client: WsClient::new(ws_config),
            cache,
            record_type: config.endpoint.record_type(),
            symbols,
        })
    }

    /// Shared view of the connection state
    pub fn status(&self) -> ConnectionStatus {
        self.client.status()
    }

    /// Symbols subscribed on every connect
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Open the upstream connection and start feeding the cache
    pub fn start(self) -> FeedHandle {
        let status = self.client.status();
        let (ws_rx, control) = self.client.connect();

        tracing::info!(
            symbols = %self.symbols.join(", "),
            record_type = %self.record_type,
            "Starting price feed"
        );

        let task = tokio::spawn(run_message_loop(
            ws_rx,
            self.cache,
            self.record_type,
            self.symbols,
        ));

        FeedHandle {
            control,
            status,
            task,
        }
    }
}

/// Handle to a running feed
pub struct FeedHandle {
    control: WsControl,
    status: ConnectionStatus,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    /// Shared view of the connection state, for health probes
    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// Drop the current connection and connect again immediately
    ///
    /// An open connection is closed with a close frame; one still
    /// connecting is abandoned. Either way only one connection exists
    /// afterwards.
    pub async fn reconnect(&self) -> Result<(), FeedError> {
        self.control.reconnect().await?;
        Ok(())
    }

    /// Close the connection and wait for the message loop to drain
    pub async fn shutdown(self) -> Result<(), FeedError> {
        if let Err(e) = self.control.shutdown().await {
            tracing::debug!(error = %e, "Feed connection already stopped");
        }
        self.task
            .await
            .map_err(|e| FeedError::TaskFailed(e.to_string()))
    }
}

/// Apply connection events to the cache until the connection task stops
async fn run_message_loop(
    mut ws_rx: mpsc::Receiver<WsMessage>,
    cache: SharedPriceCache,
    record_type: RecordType,
    symbols: Vec<String>,
) {
    while let Some(msg) = ws_rx.recv().await {
        match msg {
            WsMessage::Text(text) => {
                handle_text(&cache, record_type, &text);
            }
            WsMessage::Binary(data) => match String::from_utf8(data) {
                Ok(text) => {
                    handle_text(&cache, record_type, &text);
                }
                Err(_) => {
                    tracing::debug!("Ignoring non-UTF-8 binary frame");
                    telemetry::record_discard(TickError::NotJson.reason());
                }
            },
            WsMessage::Connected { connection_id } => {
                tracing::info!(
                    %connection_id,
                    symbols = %symbols.join(", "),
                    "Feed connected and subscribed"
                );
            }
            WsMessage::Disconnected {
                connection_id,
                code,
                reason,
            } => {
                tracing::warn!(%connection_id, ?code, %reason, "Feed disconnected");
            }
            WsMessage::Error(e) => {
                tracing::error!(error = %e, "Feed error");
            }
            WsMessage::Reconnecting { attempt, delay } => {
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    "Feed reconnecting"
                );
            }
        }
    }

    tracing::info!("Feed message loop stopped");
}

/// Apply one text payload to the cache
///
/// Returns whether the cache was updated. Malformed payloads are logged and
/// dropped; they never affect the connection.
pub fn handle_text(cache: &PriceCache, record_type: RecordType, text: &str) -> bool {
    match parse_tick(text, record_type, Utc::now().timestamp_millis()) {
        Ok(tick) => {
            cache.upsert(&tick.symbol, tick.record);
            telemetry::increment(CounterMetric::TicksReceived);
            telemetry::set_gauge(GaugeMetric::CachedSymbols, cache.size() as f64);
            tracing::trace!(symbol = %tick.symbol, price = tick.record.price, "Updated price");
            true
        }
        Err(TickError::NotJson) => {
            tracing::debug!(message = %text, "Received non-JSON message");
            telemetry::record_discard(TickError::NotJson.reason());
            false
        }
        Err(e @ TickError::InvalidJson(_)) => {
            tracing::warn!(error = %e, data = %text, "Error processing feed message");
            telemetry::record_discard(e.reason());
            false
        }
        Err(e) => {
            tracing::debug!(error = %e, data = %text, "Message without symbol or price");
            telemetry::record_discard(e.reason());
            false
        }
    }
}
