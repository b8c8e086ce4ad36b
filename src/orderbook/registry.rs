use dashmap::mapref::one::{Ref, RefMut};
use dashmap::DashMap;

use crate::orderbook::book::{BookStats, OrderBook};
use crate::orderbook::types::{AnomalyCounters, BookSnapshot};

/// Owns every instrument's book for the lifetime of a run.
///
/// Backed by a concurrent map so a sharded replay can drive disjoint
/// instrument sets through one registry without extra locking; the
/// sequential engine is simply the single-writer case. Books are created
/// lazily on first reference and never destroyed during a run.
#[derive(Debug, Default)]
pub struct BookRegistry {
    books: DashMap<String, OrderBook>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    /// Existing book for `instrument`, or a freshly registered empty one.
    ///
    /// Creating a book never invalidates entries held for other
    /// instruments.
    pub fn get_or_create(&self, instrument: &str) -> RefMut<'_, String, OrderBook> {
        self.books
            .entry(instrument.to_owned())
            .or_insert_with(|| OrderBook::new(instrument))
    }

    pub fn get(&self, instrument: &str) -> Option<Ref<'_, String, OrderBook>> {
        self.books.get(instrument)
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.books.contains_key(instrument)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Iterate every (instrument, book) pair. End-of-run reporting only,
    /// never the hot path.
    pub fn iter(&self) -> dashmap::iter::Iter<'_, String, OrderBook> {
        self.books.iter()
    }

    /// Read-only snapshot of one instrument's book.
    pub fn snapshot(&self, instrument: &str) -> Option<BookSnapshot> {
        self.books.get(instrument).map(|book| book.snapshot())
    }

    /// Per-symbol statistics, sorted by symbol for stable reporting.
    pub fn stats(&self) -> Vec<BookStats> {
        let mut stats: Vec<BookStats> = self.books.iter().map(|entry| entry.value().stats()).collect();
        stats.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        stats
    }

    /// Sum of anomaly counters across all books.
    pub fn anomaly_totals(&self) -> AnomalyCounters {
        let mut totals = AnomalyCounters::default();
        for entry in self.books.iter() {
            totals.accumulate(entry.value().anomalies());
        }
        totals
    }

    /// Move another registry's books in.
    ///
    /// Shard merge: instrument sets are disjoint by construction, so a
    /// plain insert per book is sufficient.
    pub fn absorb(&self, other: BookRegistry) {
        for (instrument, book) in other.books.into_iter() {
            self.books.insert(instrument, book);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::Side;

    #[test]
    fn test_lazy_creation() {
        let registry = BookRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("AAPL"));

        {
            let mut book = registry.get_or_create("AAPL");
            book.add(1, Side::Buy, 10000, 100);
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("AAPL"));
        assert!(registry.get("MSFT").is_none());
    }

    #[test]
    fn test_get_or_create_returns_same_book() {
        let registry = BookRegistry::new();

        registry.get_or_create("AAPL").add(1, Side::Buy, 10000, 100);
        registry.get_or_create("MSFT").add(2, Side::Sell, 20000, 50);

        // The second lookup must land on the book the add went into.
        let book = registry.get_or_create("AAPL");
        assert_eq!(book.order_count(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_stats_sorted_by_symbol() {
        let registry = BookRegistry::new();
        registry.get_or_create("MSFT");
        registry.get_or_create("AAPL");
        registry.get_or_create("GOOGL");

        let symbols: Vec<_> = registry.stats().into_iter().map(|s| s.symbol).collect();
        assert_eq!(symbols, vec!["AAPL", "GOOGL", "MSFT"]);
    }

    #[test]
    fn test_anomaly_totals_sum_across_books() {
        let registry = BookRegistry::new();

        registry.get_or_create("AAPL").cancel(1);
        registry.get_or_create("MSFT").cancel(2);
        registry.get_or_create("MSFT").execute(3, 10);

        let totals = registry.anomaly_totals();
        assert_eq!(totals.unknown_cancels, 2);
        assert_eq!(totals.unknown_executes, 1);
        assert_eq!(totals.total(), 3);
    }

    #[test]
    fn test_absorb_disjoint_registries() {
        let left = BookRegistry::new();
        left.get_or_create("AAPL").add(1, Side::Buy, 10000, 100);

        let right = BookRegistry::new();
        right.get_or_create("MSFT").add(2, Side::Sell, 20000, 50);

        left.absorb(right);

        assert_eq!(left.len(), 2);
        assert_eq!(left.get("MSFT").unwrap().order_count(), 1);
        assert_eq!(left.get("AAPL").unwrap().order_count(), 1);
    }
}
