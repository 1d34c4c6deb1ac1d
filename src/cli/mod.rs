//! CLI interface for price-relay
//!
//! Provides subcommands for:
//! - `run`: Start the feed and the HTTP API
//! - `status`: Query a running instance's health endpoint
//! - `config`: Show the effective configuration

mod run;
mod status;

pub use run::RunArgs;
pub use status::StatusArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "price-relay")]
#[command(about = "Relays real-time EODHD price ticks into an in-memory cache served over HTTP")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the feed and the HTTP API
    Run(RunArgs),
    /// Query a running instance's health endpoint
    Status(StatusArgs),
    /// Show the effective configuration
    Config,
}
