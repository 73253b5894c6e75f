//! Application state management.

use crate::config::Config;
use crate::feed::{FeedClient, PriceCache};
use crate::hub::BroadcastHub;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// Constructed once at process start and passed by handle to every
/// consumer; there are no hidden globals.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Latest-price cache, written by the feed client.
    pub cache: Arc<PriceCache>,
    /// Upstream feed client.
    pub feed: Arc<FeedClient>,
    /// Downstream fan-out hub.
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Creates the application state from configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let cache = Arc::new(PriceCache::new());
        let feed = Arc::new(FeedClient::new(config.feed.clone(), Arc::clone(&cache)));
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&feed), Arc::clone(&cache)));

        Self {
            config,
            cache,
            feed,
            hub,
        }
    }

    /// Spawns the task that drains feed events into the hub.
    pub fn spawn_event_pump(&self) {
        let hub = Arc::clone(&self.hub);
        let events = self.feed.subscribe_events();
        tokio::spawn(hub.run(events));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(Config::default())
    }
}
