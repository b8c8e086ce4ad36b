use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::metrics::collectors::{LatencyRecorder, LatencySummary};
use crate::metrics::ReplayMetrics;
use crate::orderbook::error::{ReplayError, ReplayResult};
use crate::orderbook::registry::BookRegistry;
use crate::orderbook::types::{AnomalyCounters, BookSnapshot, Event, MessageKind};
use crate::utils::time::LatencyTimer;

/// Lifecycle of one replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    NotStarted,
    Running,
    Finished,
}

/// Drives a decoded event stream through per-instrument books while timing
/// every dispatch.
///
/// Events are applied strictly in input order; operations on the same
/// instrument are order-dependent, so nothing here suspends, blocks or
/// reorders. One engine consumes exactly one event sequence, then stays
/// around for book inspection.
#[derive(Debug)]
pub struct ReplayEngine {
    registry: BookRegistry,
    recorder: LatencyRecorder,
    metrics: Arc<ReplayMetrics>,
    state: ReplayState,
    events_processed: u64,
    events_skipped: u64,
}

impl ReplayEngine {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(ReplayMetrics::new()))
    }

    /// Engine reporting into an externally owned metrics handle, so several
    /// engines (or a background reporter) can share one set of counters.
    pub fn with_metrics(metrics: Arc<ReplayMetrics>) -> Self {
        Self {
            registry: BookRegistry::new(),
            recorder: LatencyRecorder::new(),
            metrics,
            state: ReplayState::NotStarted,
            events_processed: 0,
            events_skipped: 0,
        }
    }

    /// Consume the whole event sequence and report the run's statistics.
    pub fn replay<I>(&mut self, events: I) -> ReplayResult<ReplaySummary>
    where
        I: IntoIterator<Item = Event>,
    {
        let wall = self.process(events)?;
        self.metrics.set_books(self.registry.len() as u64);
        Ok(ReplaySummary::from_run(
            self.events_processed,
            self.events_skipped,
            &self.registry,
            self.recorder.summary(wall),
        ))
    }

    /// Consume the event sequence and return the measured region's elapsed
    /// wall-clock time without building a summary.
    ///
    /// The sharded driver uses this directly: recorders from all shards are
    /// merged first, and one summary is computed over the merged samples.
    pub fn process<I>(&mut self, events: I) -> ReplayResult<Duration>
    where
        I: IntoIterator<Item = Event>,
    {
        if self.state != ReplayState::NotStarted {
            return Err(ReplayError::ReplayFinished);
        }
        self.state = ReplayState::Running;

        let wall_start = Instant::now();
        for event in events {
            if let Err(err) = self.apply(&event) {
                // A malformed record aborts the run; nothing may be
                // processed afterwards.
                self.state = ReplayState::Finished;
                return Err(err);
            }
        }
        let wall = wall_start.elapsed();
        self.state = ReplayState::Finished;

        info!(
            "Replay finished: {} events processed, {} skipped, {} instruments",
            self.events_processed,
            self.events_skipped,
            self.registry.len()
        );
        Ok(wall)
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &LatencyRecorder {
        &self.recorder
    }

    pub fn metrics(&self) -> &Arc<ReplayMetrics> {
        &self.metrics
    }

    /// Read-only snapshot of one instrument's current book.
    pub fn book_snapshot(&self, instrument: &str) -> Option<BookSnapshot> {
        self.registry.snapshot(instrument)
    }

    /// Tear the engine apart for cross-shard merging.
    pub fn into_parts(self) -> ReplayParts {
        ReplayParts {
            registry: self.registry,
            recorder: self.recorder,
            events_processed: self.events_processed,
            events_skipped: self.events_skipped,
        }
    }

    fn apply(&mut self, event: &Event) -> ReplayResult<()> {
        if event.kind == MessageKind::Ignored {
            // No book work: skip without sampling latency.
            self.events_skipped += 1;
            self.metrics.record_skipped();
            return Ok(());
        }

        let mut book = self.registry.get_or_create(&event.instrument);

        let timer = LatencyTimer::start();
        match event.kind {
            MessageKind::Add => {
                let side = event.side.ok_or_else(|| ReplayError::MissingSide {
                    order_id: event.order_id,
                    instrument: event.instrument.clone(),
                })?;
                book.add(event.order_id, side, event.price, event.quantity);
            }
            MessageKind::Cancel => book.cancel(event.order_id),
            MessageKind::Execute => book.execute(event.order_id, event.quantity),
            MessageKind::Replace => {
                let replacement =
                    event
                        .replacement
                        .ok_or_else(|| ReplayError::MissingReplacement {
                            order_id: event.order_id,
                            instrument: event.instrument.clone(),
                        })?;
                book.replace(
                    event.order_id,
                    replacement.order_id,
                    replacement.price,
                    replacement.quantity,
                );
            }
            MessageKind::Ignored => unreachable!("ignored kinds are filtered above"),
        }
        let elapsed = timer.stop();
        drop(book);

        self.recorder.sample(elapsed);
        self.metrics.record_event(event.kind, elapsed);
        self.events_processed += 1;
        Ok(())
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine torn apart after its run, ready for cross-shard merging.
#[derive(Debug)]
pub struct ReplayParts {
    pub registry: BookRegistry,
    pub recorder: LatencyRecorder,
    pub events_processed: u64,
    pub events_skipped: u64,
}

/// Final statistics of one replay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub events_processed: u64,
    pub events_skipped: u64,
    pub instruments: usize,
    pub anomalies: AnomalyCounters,
    pub latency: LatencySummary,
    pub generated_at: DateTime<Utc>,
}

impl ReplaySummary {
    pub(crate) fn from_run(
        events_processed: u64,
        events_skipped: u64,
        registry: &BookRegistry,
        latency: LatencySummary,
    ) -> Self {
        Self {
            events_processed,
            events_skipped,
            instruments: registry.len(),
            anomalies: registry.anomaly_totals(),
            latency,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::{Replacement, Side};

    #[test]
    fn test_state_transitions() {
        let mut engine = ReplayEngine::new();
        assert_eq!(engine.state(), ReplayState::NotStarted);

        engine.replay(Vec::new()).unwrap();
        assert_eq!(engine.state(), ReplayState::Finished);
    }

    #[test]
    fn test_replay_twice_is_rejected() {
        let mut engine = ReplayEngine::new();
        engine.replay(Vec::new()).unwrap();

        let err = engine
            .replay(vec![Event::add(0, 1, "AAPL", Side::Buy, 100, 10)])
            .unwrap_err();
        assert_eq!(err, ReplayError::ReplayFinished);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_one_sample_per_processed_event() {
        let mut engine = ReplayEngine::new();
        let events = vec![
            Event::add(0, 1, "AAPL", Side::Buy, 100, 10),
            Event::add(1, 2, "AAPL", Side::Sell, 105, 5),
            Event::cancel(2, 1, "AAPL"),
        ];

        let summary = engine.replay(events).unwrap();

        assert_eq!(summary.events_processed, 3);
        assert_eq!(summary.latency.count, 3);
        assert_eq!(engine.recorder().len(), 3);
    }

    #[test]
    fn test_ignored_events_skip_sampling_and_books() {
        let mut engine = ReplayEngine::new();
        let events = vec![
            Event::ignored(0, "AAPL"),
            Event::add(1, 1, "MSFT", Side::Buy, 100, 10),
            Event::ignored(2, "AAPL"),
        ];

        let summary = engine.replay(events).unwrap();

        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.events_skipped, 2);
        assert_eq!(summary.latency.count, 1);
        // Instruments only seen in ignored records never get a book.
        assert!(!engine.registry().contains("AAPL"));
        assert!(engine.registry().contains("MSFT"));
    }

    #[test]
    fn test_events_route_to_their_instrument() {
        let mut engine = ReplayEngine::new();
        let events = vec![
            Event::add(0, 1, "AAPL", Side::Buy, 100, 10),
            Event::add(1, 1, "MSFT", Side::Sell, 200, 20),
            Event::cancel(2, 1, "AAPL"),
        ];

        let summary = engine.replay(events).unwrap();
        assert_eq!(summary.instruments, 2);

        // Same id on different instruments never collides.
        assert_eq!(engine.registry().get("AAPL").unwrap().order_count(), 0);
        assert_eq!(engine.registry().get("MSFT").unwrap().order_count(), 1);
    }

    #[test]
    fn test_malformed_replace_aborts_run() {
        let mut engine = ReplayEngine::new();
        let malformed = Event {
            timestamp: 1,
            order_id: 9,
            side: None,
            price: 0,
            quantity: 0,
            kind: MessageKind::Replace,
            instrument: "AAPL".to_string(),
            replacement: None,
        };
        let events = vec![
            Event::add(0, 9, "AAPL", Side::Buy, 100, 10),
            malformed,
            Event::cancel(2, 9, "AAPL"),
        ];

        let err = engine.replay(events).unwrap_err();
        assert_eq!(
            err,
            ReplayError::MissingReplacement {
                order_id: 9,
                instrument: "AAPL".to_string()
            }
        );
        assert_eq!(engine.state(), ReplayState::Finished);

        // The event before the abort landed; the one after never ran.
        assert_eq!(engine.registry().get("AAPL").unwrap().order_count(), 1);
        assert_eq!(engine.recorder().len(), 1);
    }

    #[test]
    fn test_malformed_add_aborts_run() {
        let mut engine = ReplayEngine::new();
        let malformed = Event {
            timestamp: 0,
            order_id: 3,
            side: None,
            price: 100,
            quantity: 10,
            kind: MessageKind::Add,
            instrument: "AAPL".to_string(),
            replacement: None,
        };

        let err = engine.replay(vec![malformed]).unwrap_err();
        assert_eq!(
            err,
            ReplayError::MissingSide {
                order_id: 3,
                instrument: "AAPL".to_string()
            }
        );
        // The failed dispatch contributes no latency sample.
        assert!(engine.recorder().is_empty());
    }

    #[test]
    fn test_replace_event_flows_through_replacement_fields() {
        let mut engine = ReplayEngine::new();
        let events = vec![
            Event::add(0, 1, "AAPL", Side::Sell, 100, 10),
            Event {
                timestamp: 1,
                order_id: 1,
                side: None,
                price: 0,
                quantity: 0,
                kind: MessageKind::Replace,
                instrument: "AAPL".to_string(),
                replacement: Some(Replacement {
                    order_id: 2,
                    price: 110,
                    quantity: 25,
                }),
            },
        ];

        engine.replay(events).unwrap();

        let book = engine.registry().get("AAPL").unwrap();
        assert_eq!(book.live_order(1), None);
        let order = book.live_order(2).copied().unwrap();
        assert_eq!(order.price, 110);
        assert_eq!(order.quantity, 25);
        assert_eq!(order.side, Side::Sell);
    }

    #[test]
    fn test_summary_aggregates_anomalies() {
        let mut engine = ReplayEngine::new();
        let events = vec![
            Event::cancel(0, 1, "AAPL"),
            Event::execute(1, 2, "MSFT", 10),
            Event::add(2, 3, "MSFT", Side::Buy, 100, 10),
            Event::add(3, 3, "MSFT", Side::Buy, 101, 10),
        ];

        let summary = engine.replay(events).unwrap();

        assert_eq!(summary.anomalies.unknown_cancels, 1);
        assert_eq!(summary.anomalies.unknown_executes, 1);
        assert_eq!(summary.anomalies.duplicate_adds, 1);
        assert_eq!(summary.anomalies.total(), 3);
    }
}
