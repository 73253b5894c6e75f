//! Downstream fan-out hub.
//!
//! Tracks connected WebSocket consumers and their per-symbol group
//! memberships, and relays feed events to the connections interested
//! in them. Trade events are group-scoped; price updates go to every
//! connected consumer. Transport concerns live in
//! [`crate::api::websocket`]; the hub only knows about connection ids
//! and outbox channels.

use crate::feed::{FeedClient, FeedEvent, PriceCache, SubscriptionRegistry};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier for a downstream connection.
pub type ClientId = Uuid;

/// Events sent to downstream WebSocket consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Connection established.
    #[serde(rename = "connected")]
    Connected {
        /// Welcome message.
        message: String,
    },
    /// Latest price for a symbol. Broadcast to all consumers.
    #[serde(rename = "price_update")]
    PriceUpdate {
        /// Uppercase ticker symbol.
        symbol: String,
        /// Trade price.
        price: f64,
        /// Timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Trade detail. Delivered to the symbol's group only.
    #[serde(rename = "trade")]
    Trade {
        /// Uppercase ticker symbol.
        symbol: String,
        /// Trade price.
        price: f64,
        /// Trade volume.
        volume: f64,
        /// Timestamp in epoch milliseconds.
        timestamp: i64,
    },
    /// Subscription acknowledged.
    #[serde(rename = "subscription_confirmed")]
    SubscriptionConfirmed {
        /// Symbol subscribed to.
        symbol: String,
    },
    /// Unsubscription acknowledged.
    #[serde(rename = "unsubscription_confirmed")]
    UnsubscriptionConfirmed {
        /// Symbol unsubscribed from.
        symbol: String,
    },
    /// Liveness acknowledgment.
    #[serde(rename = "pong")]
    Pong {
        /// Server time in epoch milliseconds.
        timestamp: i64,
    },
}

/// Connection registry and group-based event fan-out.
pub struct BroadcastHub {
    feed: Arc<FeedClient>,
    cache: Arc<PriceCache>,
    registry: SubscriptionRegistry,
    /// Outbox per connection.
    clients: DashMap<ClientId, mpsc::UnboundedSender<ServerEvent>>,
    /// Symbol-group memberships per connection.
    memberships: DashMap<ClientId, HashSet<String>>,
}

impl BroadcastHub {
    /// Creates a hub over the given feed client and price cache.
    #[must_use]
    pub fn new(feed: Arc<FeedClient>, cache: Arc<PriceCache>) -> Self {
        Self {
            feed,
            cache,
            registry: SubscriptionRegistry::new(),
            clients: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Registers a new downstream connection and returns its id plus
    /// the receiving end of its outbox.
    #[must_use]
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(id, tx);
        info!("client {} connected", id);
        (id, rx)
    }

    /// Number of connected consumers.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Adds a connection to a symbol group.
    ///
    /// Idempotent per connection. The first member across all
    /// connections triggers the upstream subscribe. The joining
    /// connection immediately receives the cached price, if one
    /// exists, followed by a confirmation.
    pub async fn join(&self, id: ClientId, symbol: &str) {
        let symbol = symbol.to_uppercase();

        let newly_joined = {
            let mut groups = self.memberships.entry(id).or_default();
            groups.insert(symbol.clone())
        };

        if newly_joined && self.registry.add_interest(&symbol) {
            self.feed.subscribe(&symbol).await;
        }

        if let Some(tick) = self.cache.get(&symbol) {
            self.send_to(
                id,
                ServerEvent::PriceUpdate {
                    symbol: symbol.clone(),
                    price: tick.price,
                    timestamp: tick.timestamp_ms,
                },
            );
        }
        self.send_to(id, ServerEvent::SubscriptionConfirmed { symbol });
    }

    /// Removes a connection from a symbol group. The last member
    /// leaving triggers the upstream unsubscribe.
    pub fn leave(&self, id: ClientId, symbol: &str) {
        let symbol = symbol.to_uppercase();

        let removed = self
            .memberships
            .get_mut(&id)
            .map(|mut groups| groups.remove(&symbol))
            .unwrap_or(false);

        if removed && self.registry.remove_interest(&symbol) {
            self.feed.unsubscribe(&symbol);
        }

        self.send_to(id, ServerEvent::UnsubscriptionConfirmed { symbol });
    }

    /// Removes a connection from every group it belonged to and drops
    /// its outbox. Must run on every disconnect; a stale membership
    /// would leak fan-out targets.
    pub fn disconnect(&self, id: ClientId) {
        self.clients.remove(&id);

        if let Some((_, groups)) = self.memberships.remove(&id) {
            for symbol in groups {
                if self.registry.remove_interest(&symbol) {
                    self.feed.unsubscribe(&symbol);
                }
            }
        }

        info!("client {} disconnected", id);
    }

    /// Sends the cached price to the caller, or joins the symbol's
    /// group when no price has been observed yet so one arrives as
    /// soon as the feed produces it.
    pub async fn current_price(&self, id: ClientId, symbol: &str) {
        let symbol = symbol.to_uppercase();

        if let Some(tick) = self.cache.get(&symbol) {
            self.send_to(
                id,
                ServerEvent::PriceUpdate {
                    symbol,
                    price: tick.price,
                    timestamp: tick.timestamp_ms,
                },
            );
        } else {
            self.join(id, &symbol).await;
        }
    }

    /// Responds to a liveness probe with the current server time.
    pub fn heartbeat(&self, id: ClientId) {
        self.send_to(
            id,
            ServerEvent::Pong {
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        );
    }

    /// Fans a trade out: trade detail to the symbol's group, price
    /// update to every connection. A failed send to one connection
    /// never affects delivery to the others.
    pub fn publish_trade(&self, symbol: &str, price: f64, volume: f64, timestamp_ms: i64) {
        let trade = ServerEvent::Trade {
            symbol: symbol.to_string(),
            price,
            volume,
            timestamp: timestamp_ms,
        };
        let update = ServerEvent::PriceUpdate {
            symbol: symbol.to_string(),
            price,
            timestamp: timestamp_ms,
        };

        for entry in self.clients.iter() {
            let id = *entry.key();
            let in_group = self
                .memberships
                .get(&id)
                .is_some_and(|groups| groups.contains(symbol));

            if in_group && entry.value().send(trade.clone()).is_err() {
                debug!("failed trade delivery to {}", id);
            }
            if entry.value().send(update.clone()).is_err() {
                debug!("failed price delivery to {}", id);
            }
        }
    }

    /// Drains the feed event bus, fanning each trade out to consumers.
    /// Runs as a dedicated task so slow downstream sends never block
    /// the feed receive loop.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<FeedEvent>) {
        loop {
            match events.recv().await {
                Ok(FeedEvent::Trade {
                    symbol,
                    price,
                    volume,
                    timestamp_ms,
                }) => {
                    self.publish_trade(&symbol, price, volume, timestamp_ms);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("hub lagged {} feed events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn send_to(&self, id: ClientId, event: ServerEvent) {
        if let Some(tx) = self.clients.get(&id)
            && tx.send(event).is_err()
        {
            debug!("failed delivery to {}", id);
        }
    }
}
