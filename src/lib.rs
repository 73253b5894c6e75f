//! # Market Data Backend - Real-Time Streaming Server
//!
//! A streaming market-data backend built with [Axum](https://crates.io/crates/axum).
//! It maintains one persistent WebSocket connection to an upstream
//! market-data vendor, caches the latest trade price per symbol, and
//! fans trades out to downstream WebSocket consumers grouped by
//! symbol. OpenAPI/Swagger documentation is provided via
//! [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Upstream feed client**: subscribe/unsubscribe wire protocol,
//!   exponential reconnect backoff, and rate-limit cooldown handling.
//!
//! - **Latest-price cache**: lock-free concurrent map, read by REST
//!   handlers without ever touching network I/O.
//!
//! - **Group-based fan-out**: downstream consumers join per-symbol
//!   groups; trade events are group-scoped while price updates are
//!   broadcast to everyone.
//!
//! - **Degraded mode**: a missing vendor API key disables the feed
//!   without failing startup; the REST surface keeps working with an
//!   empty cache.
//!
//! - **Structured Logging**: request tracing with `tower-http` and
//!   `tracing` throughout the feed lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! vendor ws ──> FeedClient ──> PriceCache
//!                   │
//!                   └──> feed event bus ──> BroadcastHub ──> /ws consumers
//!                                                (symbol groups)
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, WebSocket endpoint, router configuration |
//! | [`config`] | TOML configuration with env overrides |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`feed`] | Upstream client, price cache, subscription registry |
//! | [`hub`] | Downstream connection registry and fan-out |
//! | [`models`] | Response DTOs with OpenAPI schemas |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/ws` | Downstream WebSocket |
//! | GET | `/api/v1/prices` | All cached prices |
//! | GET | `/api/v1/prices/{symbol}` | Latest cached price (404 when absent) |
//! | GET | `/api/v1/feed/status` | Upstream feed status |
//! | POST | `/api/v1/feed/connect` | Explicit (re)connect |
//! | POST | `/api/v1/feed/disconnect` | Explicit teardown |
//!
//! ## Downstream WebSocket Protocol
//!
//! Client commands (JSON): `{"action":"subscribe","symbol":"AAPL"}`,
//! `unsubscribe`, `{"action":"subscribe_many","symbols":[...]}`
//! `{"action":"get_price","symbol":"AAPL"}`, `{"action":"ping"}`.
//!
//! Server events use a `{"type": ..., "data": ...}` envelope:
//! `connected`, `price_update`, `trade`, `subscription_confirmed`,
//! `unsubscription_confirmed`, `pong`.
//!
//! ## Example Usage
//!
//! ```bash
//! # Development mode (feed disabled without a key)
//! cargo run
//!
//! # With live data
//! FINNHUB_API_KEY=xxx cargo run
//!
//! # With custom host/port
//! HOST=127.0.0.1 PORT=3000 cargo run
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod hub;
pub mod models;
pub mod state;
