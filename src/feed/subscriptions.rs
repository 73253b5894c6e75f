//! Downstream interest tracking per symbol.
//!
//! A symbol is desired upstream as long as at least one downstream
//! connection belongs to its group. The hub consults this registry on
//! join/leave and issues the upstream subscribe on the first member
//! and the upstream unsubscribe on the last one leaving.

use dashmap::DashMap;

/// Refcounted per-symbol downstream interest.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    interest: DashMap<String, usize>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more downstream consumer for a symbol.
    ///
    /// Returns `true` when this is the first consumer, meaning the
    /// caller should subscribe upstream.
    pub fn add_interest(&self, symbol: &str) -> bool {
        let mut count = self.interest.entry(symbol.to_uppercase()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Removes one downstream consumer for a symbol.
    ///
    /// Returns `true` when this was the last consumer, meaning the
    /// caller should unsubscribe upstream. Removing interest for a
    /// symbol with no consumers is a no-op returning `false`.
    pub fn remove_interest(&self, symbol: &str) -> bool {
        let symbol = symbol.to_uppercase();
        {
            let Some(mut count) = self.interest.get_mut(&symbol) else {
                return false;
            };
            *count = count.saturating_sub(1);
            if *count > 0 {
                return false;
            }
        }
        // The guard is released before removal, so the zero check must
        // be re-run atomically: a concurrent add_interest may have
        // revived the entry in between.
        self.interest
            .remove_if(&symbol, |_, count| *count == 0)
            .is_some()
    }

    /// Symbols with at least one interested consumer.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.interest
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of downstream consumers for a symbol.
    #[must_use]
    pub fn count(&self, symbol: &str) -> usize {
        self.interest
            .get(&symbol.to_uppercase())
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_first_and_last_interest() {
        let registry = SubscriptionRegistry::new();

        assert!(registry.add_interest("AAPL"));
        assert!(!registry.add_interest("AAPL"));
        assert_eq!(registry.count("AAPL"), 2);

        assert!(!registry.remove_interest("AAPL"));
        assert!(registry.remove_interest("AAPL"));
        assert_eq!(registry.count("AAPL"), 0);
        assert!(registry.symbols().is_empty());
    }

    #[test]
    fn test_remove_without_interest_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.remove_interest("MSFT"));
    }

    #[test]
    fn test_symbols_are_uppercased() {
        let registry = SubscriptionRegistry::new();
        registry.add_interest("tsla");
        assert_eq!(registry.symbols(), vec!["TSLA".to_string()]);
        assert_eq!(registry.count("TsLa"), 1);
    }

    #[test]
    fn test_concurrent_add_and_remove_never_lose_interest() {
        use std::sync::Barrier;

        // One consumer leaving while another joins must always leave
        // exactly one interest registered, whichever order the entry
        // removal and the re-insert land in.
        for _ in 0..10_000 {
            let registry = Arc::new(SubscriptionRegistry::new());
            registry.add_interest("AAPL");

            let barrier = Arc::new(Barrier::new(2));
            let remover = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.remove_interest("AAPL")
                })
            };
            let adder = {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.add_interest("AAPL")
                })
            };

            remover.join().expect("remover should not panic");
            adder.join().expect("adder should not panic");

            assert_eq!(registry.count("AAPL"), 1);
            assert_eq!(registry.symbols(), vec!["AAPL".to_string()]);
        }
    }

    #[test]
    fn test_concurrent_adds_report_exactly_one_first() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let firsts = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let firsts = Arc::clone(&firsts);
            handles.push(std::thread::spawn(move || {
                if registry.add_interest("NVDA") {
                    firsts.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("thread should not panic");
        }

        assert_eq!(firsts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count("NVDA"), 16);
    }
}
