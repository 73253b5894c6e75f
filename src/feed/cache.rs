//! In-memory cache of the latest observed trade price per symbol.

use dashmap::DashMap;

/// Latest trade observation for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTick {
    /// Last trade price.
    pub price: f64,
    /// Trade timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
}

/// Concurrent symbol -> latest price map.
///
/// Written by the feed receive loop, read by REST handlers and the
/// broadcast hub. Entries are overwritten on every trade and never
/// evicted; the symbol universe is small enough that unbounded growth
/// is acceptable.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: DashMap<String, PriceTick>,
}

impl PriceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces the latest price for a symbol.
    pub fn set(&self, symbol: &str, price: f64, timestamp_ms: i64) {
        self.prices.insert(
            symbol.to_uppercase(),
            PriceTick {
                price,
                timestamp_ms,
            },
        );
    }

    /// Returns the latest price for a symbol, if one has been observed.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<PriceTick> {
        self.prices
            .get(&symbol.to_uppercase())
            .map(|entry| *entry.value())
    }

    /// Snapshot of every cached price.
    #[must_use]
    pub fn all(&self) -> Vec<(String, PriceTick)> {
        self.prices
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Number of distinct symbols observed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// True if no price has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
