//! Route handlers

use super::AppState;
use crate::ws::ConnectionState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Header carrying the optional shared secret
pub const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// `/health` response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub websocket_status: ConnectionState,
    pub stored_symbols: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct PriceQuery {
    symbol: Option<String>,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.shared_secret.as_deref() else {
        return true;
    };

    headers
        .get(SHARED_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

pub(super) async fn latest_price(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PriceQuery>, QueryRejection>,
) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!("Rejected /latest-price request with invalid or missing secret");
        return error(StatusCode::FORBIDDEN, "Forbidden");
    }

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Rejected malformed query string");
            return error(StatusCode::BAD_REQUEST, "Invalid query string");
        }
    };

    let Some(symbol) = query.symbol.filter(|s| !s.is_empty()) else {
        return error(
            StatusCode::BAD_REQUEST,
            "Missing required query parameter: symbol",
        );
    };

    match state.cache.get(&symbol) {
        Some(record) => {
            tracing::info!(%symbol, price = record.price, "Serving latest price");
            (StatusCode::OK, Json(record)).into_response()
        }
        None => {
            tracing::info!(%symbol, "No price data found");
            error(
                StatusCode::NOT_FOUND,
                format!("Price data not found for symbol: {symbol}"),
            )
        }
    }
}

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        websocket_status: state.feed_status.get(),
        stored_symbols: state.cache.size(),
    })
}
