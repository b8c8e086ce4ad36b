use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use crate::orderbook::types::MessageKind;

pub mod collectors;

pub use collectors::{LatencyMicros, LatencyRecorder, LatencySummary};

/// Run-wide counters kept readable while a replay is in flight.
///
/// The engine updates these after each dispatch, outside the measured
/// region; the background reporter reads them concurrently. The full
/// percentile summary still comes from the [`LatencyRecorder`] at the end
/// of the run.
#[derive(Debug)]
pub struct ReplayMetrics {
    // Latency tracking per message kind
    add_latency: LatencyTracker,
    cancel_latency: LatencyTracker,
    execute_latency: LatencyTracker,
    replace_latency: LatencyTracker,

    // Throughput counters
    events_processed: AtomicU64,
    events_skipped: AtomicU64,

    // Book state
    books: AtomicU64,
}

impl ReplayMetrics {
    pub fn new() -> Self {
        // Register metric descriptions
        describe_counter!(
            "replay_events_total",
            "Total lifecycle events dispatched to books"
        );
        describe_counter!(
            "replay_events_skipped_total",
            "Events whose kinds carry no book state"
        );
        describe_histogram!(
            "replay_event_duration_seconds",
            "Duration of one book dispatch"
        );
        describe_gauge!("replay_books_total", "Number of instrument books created");

        Self {
            add_latency: LatencyTracker::new("add"),
            cancel_latency: LatencyTracker::new("cancel"),
            execute_latency: LatencyTracker::new("execute"),
            replace_latency: LatencyTracker::new("replace"),
            events_processed: AtomicU64::new(0),
            events_skipped: AtomicU64::new(0),
            books: AtomicU64::new(0),
        }
    }

    /// Record one dispatched event and the latency of its book operation.
    pub fn record_event(&self, kind: MessageKind, latency: Duration) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        counter!("replay_events_total", "kind" => kind.label()).increment(1);
        histogram!("replay_event_duration_seconds", "kind" => kind.label())
            .record(latency.as_secs_f64());

        match kind {
            MessageKind::Add => self.add_latency.record(latency),
            MessageKind::Cancel => self.cancel_latency.record(latency),
            MessageKind::Execute => self.execute_latency.record(latency),
            MessageKind::Replace => self.replace_latency.record(latency),
            MessageKind::Ignored => {}
        }
    }

    pub fn record_skipped(&self) {
        self.events_skipped.fetch_add(1, Ordering::Relaxed);
        counter!("replay_events_skipped_total").increment(1);
    }

    pub fn set_books(&self, count: u64) {
        self.books.store(count, Ordering::Relaxed);
        gauge!("replay_books_total").set(count as f64);
    }

    // Getters for current values
    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn events_skipped(&self) -> u64 {
        self.events_skipped.load(Ordering::Relaxed)
    }

    pub fn books(&self) -> u64 {
        self.books.load(Ordering::Relaxed)
    }

    pub fn latency_stats(&self) -> KindLatencyStats {
        KindLatencyStats {
            add: self.add_latency.stats(),
            cancel: self.cancel_latency.stats(),
            execute: self.execute_latency.stats(),
            replace: self.replace_latency.stats(),
        }
    }
}

impl Default for ReplayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency tracker for one message kind
#[derive(Debug)]
struct LatencyTracker {
    operation: &'static str,
    samples: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyTracker {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            samples: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn record(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;

        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);

        // Update min (with CAS loop)
        let mut current_min = self.min_nanos.load(Ordering::Relaxed);
        while nanos < current_min {
            match self.min_nanos.compare_exchange_weak(
                current_min,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(new_min) => current_min = new_min,
            }
        }

        // Update max (with CAS loop)
        let mut current_max = self.max_nanos.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max_nanos.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(new_max) => current_max = new_max,
            }
        }
    }

    fn stats(&self) -> OperationLatencyStats {
        let samples = self.samples.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        let min = self.min_nanos.load(Ordering::Relaxed);
        let max = self.max_nanos.load(Ordering::Relaxed);

        let avg = if samples > 0 { total / samples } else { 0 };

        OperationLatencyStats {
            operation: self.operation,
            samples,
            avg_nanos: avg,
            min_nanos: if min == u64::MAX { 0 } else { min },
            max_nanos: max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KindLatencyStats {
    pub add: OperationLatencyStats,
    pub cancel: OperationLatencyStats,
    pub execute: OperationLatencyStats,
    pub replace: OperationLatencyStats,
}

#[derive(Debug, Clone)]
pub struct OperationLatencyStats {
    pub operation: &'static str,
    pub samples: u64,
    pub avg_nanos: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
}

impl OperationLatencyStats {
    pub fn avg_micros(&self) -> f64 {
        self.avg_nanos as f64 / 1_000.0
    }

    pub fn min_micros(&self) -> f64 {
        self.min_nanos as f64 / 1_000.0
    }

    pub fn max_micros(&self) -> f64 {
        self.max_nanos as f64 / 1_000.0
    }
}

/// Background progress reporter for long replays.
pub struct MetricsReporter {
    metrics: Arc<ReplayMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ReplayMetrics>, interval: Duration) -> Self {
        Self { metrics, interval }
    }

    pub async fn run(&self) {
        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            let stats = self.metrics.latency_stats();

            info!(
                "Replay progress - events: {} (skipped {}) | books: {} | latency (μs): add={:.2} cancel={:.2} execute={:.2} replace={:.2}",
                self.metrics.events_processed(),
                self.metrics.events_skipped(),
                self.metrics.books(),
                stats.add.avg_micros(),
                stats.cancel.avg_micros(),
                stats.execute.avg_micros(),
                stats.replace.avg_micros()
            );
        }
    }
}
