//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use self::metrics::{
    increment, init_metrics, record_discard, set_gauge, CounterMetric, DiscardReason,
    GaugeMetric,
};

use crate::config::TelemetryConfig;

/// Initialize logging from the telemetry config
///
/// The metrics exporter is started separately by the `run` command so that
/// one-shot commands never bind the metrics port.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)
}
