//! HTTP and WebSocket client library for the Market Data API.
//!
//! This crate provides a typed HTTP client for the REST endpoints of the
//! market data backend and a WebSocket client for the real-time price
//! stream.
//!
//! # Example
//!
//! ```no_run
//! use marketdata_client::{ClientConfig, MarketDataClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), marketdata_client::Error> {
//!     let client = MarketDataClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     // Check health
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;
mod websocket;

pub use client::{ClientConfig, MarketDataClient};
pub use error::Error;
pub use types::*;
pub use websocket::{ClientCommand, WsClient, WsMessage};
