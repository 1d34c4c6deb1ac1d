//! Configuration types for price-relay
//!
//! Settings come from an optional TOML file; credentials and the HTTP port
//! come from the environment (`EODHD_API_KEY`, `SHARED_SECRET`, `PORT`).

use crate::feed::FeedEndpoint;
use crate::telemetry::LogFormat;
use crate::ws::{BackoffMode, ReconnectConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the upstream API token
pub const API_KEY_ENV: &str = "EODHD_API_KEY";
/// Environment variable holding the optional HTTP shared secret
pub const SHARED_SECRET_ENV: &str = "SHARED_SECRET";
/// Environment variable overriding the HTTP port
pub const PORT_ENV: &str = "PORT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Upstream credential missing
    #[error("EODHD_API_KEY environment variable is not set")]
    MissingApiKey,
    /// No symbols to subscribe to
    #[error("feed.symbols must list at least one symbol")]
    EmptyWatchList,
    /// Environment override is malformed
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
    /// A timing setting that must be positive is zero
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

/// Upstream feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Endpoint to subscribe to; decides the record type of every tick
    #[serde(default)]
    pub endpoint: FeedEndpoint,

    /// WebSocket base URL; the endpoint path is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Watch-list sent in the subscribe message
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Delay before each reconnect attempt (seconds)
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upper bound on one connection attempt (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Keepalive ping interval (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Pong wait before the connection is treated as dead (seconds)
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectSection,
}

fn default_base_url() -> String {
    "wss://ws.eodhistoricaldata.com/ws".to_string()
}
fn default_symbols() -> Vec<String> {
    vec![
        "AAPL.US".to_string(),
        "MSFT.US".to_string(),
        "TSLA.US".to_string(),
    ]
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_ping_interval_secs() -> u64 {
    30
}
fn default_pong_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: FeedEndpoint::default(),
            base_url: default_base_url(),
            symbols: default_symbols(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
            reconnect: ReconnectSection::default(),
        }
    }
}

impl FeedConfig {
    /// Reconnect policy described by this section
    pub fn reconnect_config(&self) -> ReconnectConfig {
        let delay = Duration::from_secs(self.reconnect_delay_secs);
        match self.reconnect.mode {
            BackoffMode::Fixed => ReconnectConfig::fixed(delay),
            BackoffMode::Exponential => ReconnectConfig::exponential(
                delay,
                Duration::from_secs(self.reconnect.max_delay_secs),
                self.reconnect.jitter_factor,
            ),
        }
    }
}

/// Reconnect backoff tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSection {
    /// `fixed` (default) or `exponential`
    #[serde(default)]
    pub mode: BackoffMode,

    /// Cap for exponential mode (seconds)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Jitter fraction for exponential mode
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_delay_secs() -> u64 {
    60
}
fn default_jitter_factor() -> f64 {
    0.1
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            mode: BackoffMode::Fixed,
            max_delay_secs: default_max_delay_secs(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_port() -> u16 {
    3000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when unset
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Credentials taken from the environment
#[derive(Clone, Default)]
pub struct Secrets {
    api_key: Option<String>,
    shared_secret: Option<String>,
}

impl Secrets {
    pub fn new(api_key: Option<String>, shared_secret: Option<String>) -> Self {
        Self {
            api_key: non_blank(api_key),
            shared_secret: non_blank(shared_secret),
        }
    }

    /// Upstream API token
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Value clients must send in `x-shared-secret`
    pub fn shared_secret(&self) -> Option<&str> {
        self.shared_secret.as_deref()
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Secrets")
            .field("api_key", &redact(&self.api_key))
            .field("shared_secret", &redact(&self.shared_secret))
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.secrets = Secrets::new(lookup(API_KEY_ENV), lookup(SHARED_SECRET_ENV));

        if let Some(value) = non_blank(lookup(PORT_ENV)) {
            self.http.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: PORT_ENV,
                    value,
                })?;
        }

        Ok(())
    }

    /// Check everything the `run` command needs
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_key()?;
        if self.feed.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyWatchList);
        }

        let durations = [
            ("feed.reconnect_delay_secs", self.feed.reconnect_delay_secs),
            ("feed.connect_timeout_secs", self.feed.connect_timeout_secs),
            ("feed.ping_interval_secs", self.feed.ping_interval_secs),
            ("feed.pong_timeout_secs", self.feed.pong_timeout_secs),
        ];
        if let Some(&(name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroDuration(name));
        }
        Ok(())
    }

    /// Upstream API token, required to start the feed
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.secrets.api_key().ok_or(ConfigError::MissingApiKey)
    }
}
