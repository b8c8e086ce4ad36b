use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Records one duration sample per processed event and reduces them to
/// order-statistic percentiles once a run completes.
#[derive(Debug, Default, Clone)]
pub struct LatencyRecorder {
    samples: Vec<Duration>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append one measurement; O(1) amortized, called once per event.
    pub fn sample(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    /// Fold another recorder's samples in.
    ///
    /// Shard results go through this before any percentile is computed;
    /// samples are merged once at summary time, never interleaved mid-run.
    pub fn merge(&mut self, other: LatencyRecorder) {
        self.samples.extend(other.samples);
    }

    /// Reduce all samples against the measured region's elapsed wall time.
    ///
    /// Percentile `p` (0 <= p < 1) is the sorted sample at index
    /// `floor(p * count)`, 0-indexed. Throughput divides the sample count
    /// by the wall clock of the whole measured region, which includes
    /// pauses and contention the per-event samples cannot see.
    pub fn summary(&self, wall_time: Duration) -> LatencySummary {
        if self.samples.is_empty() {
            return LatencySummary {
                wall_time,
                ..LatencySummary::default()
            };
        }

        let mut sorted = self.samples.clone();
        sorted.sort();

        let len = sorted.len();
        let pct = |p: f64| sorted[(p * len as f64) as usize];
        let total: Duration = sorted.iter().sum();

        let wall_seconds = wall_time.as_secs_f64();
        let throughput = if wall_seconds > 0.0 {
            len as f64 / wall_seconds
        } else {
            0.0
        };

        LatencySummary {
            count: len as u64,
            min: sorted[0],
            mean: total / len as u32,
            p50: pct(0.50),
            p95: pct(0.95),
            p99: pct(0.99),
            max: sorted[len - 1],
            throughput,
            wall_time,
        }
    }
}

/// End-of-run latency and throughput statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
    /// Events per second over the measured wall-clock region.
    pub throughput: f64,
    pub wall_time: Duration,
}

impl LatencySummary {
    /// Convert to microseconds for easier reading
    pub fn to_micros(&self) -> LatencyMicros {
        LatencyMicros {
            count: self.count,
            min: self.min.as_nanos() as f64 / 1_000.0,
            mean: self.mean.as_nanos() as f64 / 1_000.0,
            p50: self.p50.as_nanos() as f64 / 1_000.0,
            p95: self.p95.as_nanos() as f64 / 1_000.0,
            p99: self.p99.as_nanos() as f64 / 1_000.0,
            max: self.max.as_nanos() as f64 / 1_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatencyMicros {
    pub count: u64,
    pub min: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}
