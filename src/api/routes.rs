//! Route configuration.

use crate::api::{handlers, websocket};
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket
        .route("/ws", get(websocket::ws_handler))
        // Prices
        .route("/api/v1/prices", get(handlers::get_all_prices))
        .route("/api/v1/prices/{symbol}", get(handlers::get_latest_price))
        // Feed control
        .route("/api/v1/feed/status", get(handlers::get_feed_status))
        .route("/api/v1/feed/connect", post(handlers::connect_feed))
        .route("/api/v1/feed/disconnect", post(handlers::disconnect_feed))
        .with_state(state)
}
