//! Run command implementation

use crate::cache::PriceCache;
use crate::config::Config;
use crate::feed::FeedManager;
use crate::server::{AppState, HttpServer};
use crate::telemetry;
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// HTTP port (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let api_key = config.api_key()?;
        let port = self.port.unwrap_or(config.http.port);

        if let Some(metrics_port) = config.telemetry.metrics_port {
            telemetry::init_metrics(metrics_port)?;
        }

        let cache = PriceCache::shared();
        let manager = FeedManager::new(&config.feed, api_key, cache.clone())?;
        let state = AppState::new(cache, manager.status(), config.secrets.shared_secret());

        if config.secrets.shared_secret().is_some() {
            tracing::info!("Shared secret required for /latest-price");
        }

        let feed = manager.start();
        let server = HttpServer::new(port, state);

        let served = server.run(shutdown_signal()).await;

        tracing::info!("Shutting down price feed");
        feed.shutdown().await?;
        served?;

        tracing::info!("Shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
