//! Status command implementation

use clap::Args;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Base URL of the running instance
    #[arg(long, default_value = "http://localhost:3000")]
    pub url: String,
}

/// `/health` body as returned by a running instance
#[derive(Debug, Deserialize)]
pub struct RemoteHealth {
    pub status: String,
    pub websocket_status: String,
    pub stored_symbols: usize,
}

impl StatusArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let url = format!("{}/health", self.url.trim_end_matches('/'));
        tracing::debug!(%url, "Querying health endpoint");

        let health: RemoteHealth = reqwest::get(&url)
            .await?
            .error_for_status()?
            .json()
            .await?;

        println!("price-relay status ({})", self.url);
        println!("  Status: {}", health.status);
        println!("  WebSocket: {}", health.websocket_status);
        println!("  Stored symbols: {}", health.stored_symbols);

        Ok(())
    }
}
