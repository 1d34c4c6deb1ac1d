//! price-relay: latest-price relay for the EODHD real-time feed
//!
//! This library provides the core components for:
//! - A reconnecting WebSocket client owning one upstream connection
//! - The feed manager that subscribes and parses ticks
//! - A concurrent latest-price cache
//! - The HTTP query API over the cache
//! - Configuration, logging and metrics

pub mod cache;
pub mod cli;
pub mod config;
pub mod feed;
pub mod server;
pub mod telemetry;
pub mod ws;
