//! REST API handlers.

use crate::error::ApiError;
use crate::models::{
    FeedActionResponse, FeedStatusResponse, HealthResponse, PriceResponse, PricesListResponse,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        feed_state: state.feed.connection_state().as_str().to_string(),
    })
}

/// Get all cached prices.
#[utoipa::path(
    get,
    path = "/api/v1/prices",
    responses(
        (status = 200, description = "All cached prices", body = PricesListResponse)
    ),
    tag = "Prices"
)]
pub async fn get_all_prices(State(state): State<Arc<AppState>>) -> Json<PricesListResponse> {
    let mut prices: Vec<PriceResponse> = state
        .cache
        .all()
        .into_iter()
        .map(|(symbol, tick)| PriceResponse {
            symbol,
            price: tick.price,
            timestamp: tick.timestamp_ms,
        })
        .collect();
    prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let count = prices.len();
    Json(PricesListResponse { prices, count })
}

/// Get the latest cached price for a symbol.
#[utoipa::path(
    get,
    path = "/api/v1/prices/{symbol}",
    params(
        ("symbol" = String, Path, description = "Ticker symbol")
    ),
    responses(
        (status = 200, description = "Latest price", body = PriceResponse),
        (status = 404, description = "No price observed for symbol")
    ),
    tag = "Prices"
)]
pub async fn get_latest_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let symbol = symbol.to_uppercase();

    let tick = state
        .feed
        .latest_price(&symbol)
        .ok_or_else(|| ApiError::PriceNotFound(symbol.clone()))?;

    Ok(Json(PriceResponse {
        symbol,
        price: tick.price,
        timestamp: tick.timestamp_ms,
    }))
}

/// Get the upstream feed status.
#[utoipa::path(
    get,
    path = "/api/v1/feed/status",
    responses(
        (status = 200, description = "Feed status", body = FeedStatusResponse)
    ),
    tag = "Feed"
)]
pub async fn get_feed_status(State(state): State<Arc<AppState>>) -> Json<FeedStatusResponse> {
    let mut symbols = state.feed.subscribed_symbols();
    symbols.sort();

    Json(FeedStatusResponse {
        state: state.feed.connection_state().as_str().to_string(),
        connected: state.feed.is_connected(),
        enabled: state.feed.enabled(),
        reconnect_attempts: state.feed.reconnect_attempts(),
        rate_limited: state.feed.is_rate_limited(),
        subscribed_symbols: symbols,
        downstream_connections: state.hub.connection_count(),
    })
}

/// Explicitly connect (or reconnect) the upstream feed.
///
/// Re-arms the automatic retry mechanism after the client gave up.
#[utoipa::path(
    post,
    path = "/api/v1/feed/connect",
    responses(
        (status = 200, description = "Connect attempt initiated", body = FeedActionResponse)
    ),
    tag = "Feed"
)]
pub async fn connect_feed(State(state): State<Arc<AppState>>) -> Json<FeedActionResponse> {
    if !state.feed.enabled() {
        return Json(FeedActionResponse {
            success: false,
            state: state.feed.connection_state().as_str().to_string(),
            message: "Feed is disabled: no API key configured".to_string(),
        });
    }

    state.feed.connect().await;

    Json(FeedActionResponse {
        success: true,
        state: state.feed.connection_state().as_str().to_string(),
        message: "Connect attempt processed".to_string(),
    })
}

/// Tear down the upstream feed connection.
#[utoipa::path(
    post,
    path = "/api/v1/feed/disconnect",
    responses(
        (status = 200, description = "Feed disconnected", body = FeedActionResponse)
    ),
    tag = "Feed"
)]
pub async fn disconnect_feed(State(state): State<Arc<AppState>>) -> Json<FeedActionResponse> {
    state.feed.disconnect();

    Json(FeedActionResponse {
        success: true,
        state: state.feed.connection_state().as_str().to_string(),
        message: "Feed disconnected".to_string(),
    })
}
