//! Response types mirroring the server API.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Upstream feed connection state.
    pub feed_state: String,
}

/// Latest cached price for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    /// Uppercase ticker symbol.
    pub symbol: String,
    /// Last trade price.
    pub price: f64,
    /// Trade timestamp in epoch milliseconds.
    pub timestamp: i64,
}

/// All cached prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesListResponse {
    /// Cached prices.
    pub prices: Vec<PriceResponse>,
    /// Number of cached symbols.
    pub count: usize,
}

/// Upstream feed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStatusResponse {
    /// Connection state (disconnected/connecting/connected/rate_limited).
    pub state: String,
    /// Whether the upstream socket is open.
    pub connected: bool,
    /// Whether an API key is configured.
    pub enabled: bool,
    /// Reconnect attempts since the last successful connect.
    pub reconnect_attempts: u32,
    /// Whether the rate-limit cooldown is active.
    pub rate_limited: bool,
    /// Symbols currently subscribed upstream.
    pub subscribed_symbols: Vec<String>,
    /// Number of downstream WebSocket consumers.
    pub downstream_connections: usize,
}

/// Result of an explicit feed connect/disconnect request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedActionResponse {
    /// Whether the request was accepted.
    pub success: bool,
    /// Connection state after the action.
    pub state: String,
    /// Message describing the result.
    pub message: String,
}

/// Error payload returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
}
