//! HTTP query API
//!
//! # Endpoints
//!
//! - `GET /latest-price?symbol=AAPL.US` - latest cached record for a symbol
//! - `GET /health` - connection state and cache size

mod handlers;

pub use handlers::{ErrorBody, HealthResponse, SHARED_SECRET_HEADER};

use crate::cache::SharedPriceCache;
use crate::ws::ConnectionStatus;
use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    cache: SharedPriceCache,
    feed_status: ConnectionStatus,
    shared_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        cache: SharedPriceCache,
        feed_status: ConnectionStatus,
        shared_secret: Option<&str>,
    ) -> Self {
        Self {
            cache,
            feed_status,
            shared_secret: shared_secret.map(Arc::from),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/latest-price", get(handlers::latest_price))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// HTTP server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to port
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),
    /// Server error
    #[error("server error: {0}")]
    ServeFailed(String),
}

/// HTTP server over the price cache
pub struct HttpServer {
    port: u16,
    state: AppState,
}

impl HttpServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::ServeFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
