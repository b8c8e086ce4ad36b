//! Core order book reconstruction module
//!
//! This module contains the per-instrument book state, the price-level
//! aggregates derived from it, and the registry that owns one book per
//! instrument for the lifetime of a replay.

pub mod book;
pub mod error;
pub mod price_level;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use book::{BookStats, OrderBook};
pub use error::{ReplayError, ReplayResult};
pub use price_level::PriceLevels;
pub use registry::BookRegistry;
pub use types::{
    AnomalyCounters, BookSnapshot, Event, LiveOrder, MessageKind, OrderId, OrderInfo, Price,
    PriceLevelInfo, Quantity, Replacement, Side,
};
