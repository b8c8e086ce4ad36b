use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::metrics::collectors::LatencyRecorder;
use crate::metrics::ReplayMetrics;
use crate::orderbook::error::ReplayResult;
use crate::orderbook::registry::BookRegistry;
use crate::orderbook::types::Event;
use crate::replay::engine::{ReplayEngine, ReplayParts, ReplaySummary};
use crate::utils::instrument_shard;

/// Data-parallel replay partitioned by instrument hash.
///
/// Instruments are fully independent, so the stream can be split by symbol
/// across workers as long as per-instrument order is preserved within each
/// partition. The partitioning is static: every instrument is pinned to one
/// shard before replay starts, so no book is ever touched by two workers.
/// Latency samples are merged across shards before percentiles are
/// computed, never interleaved mid-run.
#[derive(Debug)]
pub struct ShardedReplay {
    shard_count: usize,
    metrics: Arc<ReplayMetrics>,
}

impl ShardedReplay {
    pub fn new(shard_count: usize) -> Self {
        Self::with_metrics(shard_count, Arc::new(ReplayMetrics::new()))
    }

    pub fn with_metrics(shard_count: usize, metrics: Arc<ReplayMetrics>) -> Self {
        Self {
            shard_count: shard_count.max(1),
            metrics,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Replay the stream across the shards and merge the results.
    ///
    /// The summary's wall region spans the whole parallel section, so
    /// throughput reflects real elapsed time across workers.
    pub fn replay(&self, events: Vec<Event>) -> ReplayResult<ShardedOutcome> {
        let partitions = partition_by_instrument(events, self.shard_count);

        let wall_start = Instant::now();
        let parts: Vec<ReplayParts> = partitions
            .into_par_iter()
            .map(|partition| {
                let mut engine = ReplayEngine::with_metrics(Arc::clone(&self.metrics));
                engine.process(partition)?;
                Ok(engine.into_parts())
            })
            .collect::<ReplayResult<Vec<_>>>()?;
        let wall = wall_start.elapsed();

        let registry = BookRegistry::new();
        let mut recorder = LatencyRecorder::new();
        let mut events_processed = 0;
        let mut events_skipped = 0;
        for part in parts {
            registry.absorb(part.registry);
            recorder.merge(part.recorder);
            events_processed += part.events_processed;
            events_skipped += part.events_skipped;
        }
        self.metrics.set_books(registry.len() as u64);

        info!(
            "Sharded replay finished: {} events across {} shards, {} instruments",
            events_processed,
            self.shard_count,
            registry.len()
        );

        let summary = ReplaySummary::from_run(
            events_processed,
            events_skipped,
            &registry,
            recorder.summary(wall),
        );
        Ok(ShardedOutcome { summary, registry })
    }
}

/// Result of a sharded run: the merged statistics plus the merged registry
/// for per-symbol inspection.
#[derive(Debug)]
pub struct ShardedOutcome {
    pub summary: ReplaySummary,
    pub registry: BookRegistry,
}

/// Split a stream into per-shard substreams.
///
/// Events of one instrument always land in the same partition, in their
/// original relative order.
fn partition_by_instrument(events: Vec<Event>, shard_count: usize) -> Vec<Vec<Event>> {
    let mut partitions: Vec<Vec<Event>> = (0..shard_count).map(|_| Vec::new()).collect();
    for event in events {
        let shard = instrument_shard(&event.instrument, shard_count);
        partitions[shard].push(event);
    }
    partitions
}
