//! Limit-order-book replay demo
//!
//! Generates a deterministic synthetic lifecycle feed for a handful of
//! symbols, replays it sequentially and then sharded by instrument, and
//! reports latency/throughput statistics with live progress metrics.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use lob_replay_engine::metrics::{MetricsReporter, ReplayMetrics};
use lob_replay_engine::replay::{ReplayEngine, ReplaySummary, ShardedReplay};
use lob_replay_engine::utils::format_price;
use lob_replay_engine::utils::time::Clock;
use lob_replay_engine::{Event, Side};

const SYMBOLS: &[&str] = &["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"];
const EVENTS_PER_SYMBOL: u64 = 200_000;
const SHARDS: usize = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Starting LOB replay demo...");

    start_metrics_server()?;

    let events = synthetic_feed(SYMBOLS, EVENTS_PER_SYMBOL);
    info!(
        "Generated {} synthetic events across {} symbols",
        events.len(),
        SYMBOLS.len()
    );

    let metrics = Arc::new(ReplayMetrics::new());

    // Start metrics reporting
    let reporter = MetricsReporter::new(Arc::clone(&metrics), Duration::from_secs(5));
    tokio::spawn(async move {
        reporter.run().await;
    });

    // Sequential replay
    let sequential_events = events.clone();
    let sequential_metrics = Arc::clone(&metrics);
    let (summary, engine) = tokio::task::spawn_blocking(move || {
        let mut engine = ReplayEngine::with_metrics(sequential_metrics);
        let summary = engine.replay(sequential_events)?;
        Ok::<_, lob_replay_engine::ReplayError>((summary, engine))
    })
    .await??;

    print_summary("sequential", &summary);

    for stats in engine.registry().stats() {
        info!(
            "{} | orders: {} | levels: {}/{} | bid: {:?} | ask: {:?} | spread: {:?} | anomalies: {}",
            stats.symbol,
            stats.live_orders,
            stats.bid_levels,
            stats.ask_levels,
            stats.best_bid.map(|p| format_price(p, 0.01)),
            stats.best_ask.map(|p| format_price(p, 0.01)),
            stats.spread.map(|s| format_price(s, 0.01)),
            stats.anomalies.total()
        );
    }

    // Sharded replay over the same stream for comparison
    let sharded = ShardedReplay::with_metrics(SHARDS, Arc::clone(&metrics));
    let outcome = tokio::task::spawn_blocking(move || sharded.replay(events)).await??;
    print_summary("sharded", &outcome.summary);

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn print_summary(mode: &str, summary: &ReplaySummary) {
    let micros = summary.latency.to_micros();

    info!("LOB replay metrics ({})", mode);
    info!("  events processed : {}", summary.events_processed);
    info!("  events skipped   : {}", summary.events_skipped);
    info!("  instruments      : {}", summary.instruments);
    info!("  anomalies        : {}", summary.anomalies.total());
    info!(
        "  wall time (s)    : {:.6}",
        summary.latency.wall_time.as_secs_f64()
    );
    info!(
        "  throughput       : {:.2} M events/s",
        summary.latency.throughput / 1e6
    );
    info!("  latency (μs) p50 : {:.3}", micros.p50);
    info!("  latency (μs) p95 : {:.3}", micros.p95);
    info!("  latency (μs) p99 : {:.3}", micros.p99);
    info!("  latency (μs) max : {:.3}", micros.max);
}

/// Deterministic multi-symbol lifecycle feed.
///
/// Counter-patterned like real book traffic: mostly adds, with executes,
/// cancels and replaces against ids known to be live, plus the occasional
/// non-book kind and stale-id reference the engine must absorb silently.
fn synthetic_feed(symbols: &[&str], events_per_symbol: u64) -> Vec<Event> {
    let epoch = Clock::nanos();

    let per_symbol: Vec<Vec<Event>> = symbols
        .iter()
        .enumerate()
        .map(|(s, symbol)| symbol_feed(symbol, s as u64, epoch, events_per_symbol))
        .collect();

    // Round-robin merge so the replay hops between books like a real feed.
    let mut merged = Vec::with_capacity(per_symbol.iter().map(Vec::len).sum());
    let mut feeds: Vec<std::vec::IntoIter<Event>> =
        per_symbol.into_iter().map(Vec::into_iter).collect();
    loop {
        let mut exhausted = true;
        for feed in &mut feeds {
            if let Some(event) = feed.next() {
                merged.push(event);
                exhausted = false;
            }
        }
        if exhausted {
            break;
        }
    }
    merged
}

fn symbol_feed(symbol: &str, seed: u64, epoch: u64, events: u64) -> Vec<Event> {
    let base_price = 10_000 + seed * 500;
    let mut next_id = (seed + 1) << 32;
    let mut live: VecDeque<u64> = VecDeque::new();
    let mut feed = Vec::with_capacity(events as usize);

    for i in 0..events {
        let ts = epoch + i * 1_000;
        match i % 10 {
            // Adds (60% of activity)
            0..=5 => {
                next_id += 1;
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                let offset = i % 40;
                let price = if side == Side::Buy {
                    base_price - offset
                } else {
                    base_price + offset
                };
                feed.push(Event::add(ts, next_id, symbol, side, price, 100 + i % 300));
                live.push_back(next_id);
            }

            // Partial executions against the oldest live order
            6 => {
                if let Some(&id) = live.front() {
                    feed.push(Event::execute(ts, id, symbol, 50));
                }
            }

            // Cancellations
            7 => {
                if let Some(id) = live.pop_front() {
                    feed.push(Event::cancel(ts, id, symbol));
                }
            }

            // Replaces: new id, nudged price, reset quantity
            8 => {
                if let Some(id) = live.pop_front() {
                    next_id += 1;
                    feed.push(Event::replace(ts, id, symbol, next_id, base_price + i % 25, 150));
                    live.push_back(next_id);
                }
            }

            // Non-book kinds and stale references
            9 => {
                if i % 30 == 9 {
                    feed.push(Event::ignored(ts, symbol));
                } else {
                    feed.push(Event::cancel(ts, u64::MAX - i, symbol));
                }
            }

            _ => unreachable!(),
        }
    }
    feed
}

/// Start Prometheus metrics server
fn start_metrics_server() -> Result<(), Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr: SocketAddr = "0.0.0.0:9090".parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Prometheus metrics available at http://{}/metrics", addr);
    Ok(())
}
