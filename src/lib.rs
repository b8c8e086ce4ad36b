//! High-Performance Limit-Order-Book Replay Engine
//!
//! Reconstructs per-instrument limit order books from a time-ordered stream
//! of decoded order-lifecycle events (add/cancel/execute/replace) while
//! measuring per-event processing latency and aggregate throughput.
//!
//! # Features
//!
//! - **Exact book state**: live orders and per-price aggregates stay
//!   consistent under duplicate adds, stale references and oversized
//!   executes
//! - **Per-event latency**: every dispatch is timed; end-of-run summaries
//!   report p50/p95/p99/max order statistics and wall-clock throughput
//! - **Instrument sharding**: optional data-parallel replay that pins each
//!   instrument to one worker and merges samples before any percentile math
//! - **Comprehensive monitoring**: `tracing` logs plus a Prometheus-ready
//!   `metrics` surface with a background progress reporter
//!
//! # Quick Start
//!
//! ```rust
//! use lob_replay_engine::{Event, ReplayEngine, Side};
//!
//! let events = vec![
//!     Event::add(0, 1, "AAPL", Side::Buy, 15_000, 100),
//!     Event::execute(1, 1, "AAPL", 40),
//!     Event::cancel(2, 1, "AAPL"),
//! ];
//!
//! let mut engine = ReplayEngine::new();
//! let summary = engine.replay(events)?;
//! assert_eq!(summary.events_processed, 3);
//!
//! let snapshot = engine.book_snapshot("AAPL").unwrap();
//! assert!(snapshot.orders.is_empty());
//! # Ok::<(), lob_replay_engine::ReplayError>(())
//! ```
//!
//! # Architecture
//!
//! The engine consumes already-decoded [`Event`] records; wire-protocol
//! parsing and columnar storage of the stream live upstream. Each event is
//! routed through the [`BookRegistry`] to its instrument's [`OrderBook`],
//! which keeps two structures in lockstep:
//!
//! 1. **Live orders**: `HashMap<OrderId, LiveOrder>`
//! 2. **Price levels**: per-side `HashMap<Price, Quantity>` aggregates,
//!    with levels deleted the moment their total reaches zero
//!
//! All book operations are a constant number of map lookups; there is no
//! matching or crossing, the feed already resolved executions.

pub mod metrics;
pub mod orderbook;
pub mod replay;
pub mod utils;

// Re-export commonly used types
pub use orderbook::{
    error::{ReplayError, ReplayResult},
    registry::BookRegistry,
    types::{
        AnomalyCounters, BookSnapshot, Event, LiveOrder, MessageKind, OrderId, Price, Quantity,
        Replacement, Side,
    },
    OrderBook,
};

pub use self::metrics::{LatencyRecorder, LatencySummary, ReplayMetrics};
pub use replay::{ReplayEngine, ReplayState, ReplaySummary, ShardedReplay};

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_replay_reconstructs_single_instrument_book() {
        let events = vec![
            Event::add(0, 1, "XYZ", Side::Buy, 100, 10),
            Event::add(1, 2, "XYZ", Side::Buy, 100, 5),
            Event::execute(2, 1, "XYZ", 4),
            Event::cancel(3, 2, "XYZ"),
            Event::replace(4, 1, "XYZ", 3, 105, 20),
        ];

        let mut engine = ReplayEngine::new();
        let summary = engine.replay(events).unwrap();

        assert_eq!(summary.events_processed, 5);
        assert_eq!(summary.instruments, 1);
        assert_eq!(summary.anomalies.total(), 0);

        let registry = engine.registry();
        let book = registry.get("XYZ").unwrap();
        assert_eq!(book.order_count(), 1);
        assert_eq!(
            book.live_order(3),
            Some(&LiveOrder {
                price: 105,
                quantity: 20,
                side: Side::Buy
            })
        );

        let bids: Vec<_> = book.bid_levels().iter().collect();
        assert_eq!(bids, vec![(105, 20)]);
        assert!(book.ask_levels().is_empty());
        assert!(book.verify_aggregates());
    }

    #[test]
    fn test_replay_keeps_instruments_independent() {
        let events = vec![
            Event::add(0, 1, "AAPL", Side::Buy, 15_000, 100),
            Event::add(1, 1, "MSFT", Side::Buy, 40_000, 200),
            Event::execute(2, 1, "AAPL", 100),
            Event::add(3, 2, "MSFT", Side::Sell, 40_100, 50),
        ];

        let mut engine = ReplayEngine::new();
        let summary = engine.replay(events).unwrap();

        assert_eq!(summary.instruments, 2);

        let aapl = engine.book_snapshot("AAPL").unwrap();
        assert!(aapl.orders.is_empty());
        assert!(aapl.bids.is_empty());

        let msft = engine.book_snapshot("MSFT").unwrap();
        assert_eq!(msft.orders.len(), 2);
        assert_eq!(msft.bids.len(), 1);
        assert_eq!(msft.asks.len(), 1);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let mut engine = ReplayEngine::new();
        let summary = engine
            .replay(vec![Event::add(0, 1, "AAPL", Side::Buy, 100, 10)])
            .unwrap();

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"events_processed\":1"));
        assert!(json.contains("\"throughput\""));
    }
}
