//! Upstream market-data feed: vendor WebSocket client, latest-price
//! cache, and downstream interest tracking.

pub mod cache;
pub mod client;
pub mod subscriptions;

pub use cache::{PriceCache, PriceTick};
pub use client::{ConnectionState, FeedClient, FeedEvent};
pub use subscriptions::SubscriptionRegistry;
