pub mod time;

/// Convert price from ticks to human-readable format
pub fn format_price(price_ticks: u64, tick_size: f64) -> String {
    format!("${:.2}", price_ticks as f64 * tick_size)
}

/// Convert human price to ticks
pub fn price_to_ticks(price: f64, tick_size: f64) -> u64 {
    (price / tick_size).round() as u64
}

/// Stable shard index for an instrument symbol.
///
/// Used by the sharded replay to pin every instrument to exactly one
/// worker before replay starts.
pub fn instrument_shard(instrument: &str, shard_count: usize) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    instrument.hash(&mut hasher);
    (hasher.finish() as usize) % shard_count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(10000, 0.01), "$100.00");
        assert_eq!(format_price(12550, 0.01), "$125.50");
    }

    #[test]
    fn test_price_to_ticks() {
        assert_eq!(price_to_ticks(100.0, 0.01), 10000);
        assert_eq!(price_to_ticks(125.50, 0.01), 12550);
    }

    #[test]
    fn test_instrument_shard_is_stable_and_in_range() {
        for symbol in ["AAPL", "MSFT", "GOOGL", ""] {
            let shard = instrument_shard(symbol, 4);
            assert!(shard < 4);
            assert_eq!(shard, instrument_shard(symbol, 4));
        }
    }

    #[test]
    fn test_instrument_shard_zero_count() {
        assert_eq!(instrument_shard("AAPL", 0), 0);
    }
}
