use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type OrderId = u64;
pub type Price = u64; // Price in exchange tick units (e.g., 1 tick = 0.01 cents)
pub type Quantity = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle kinds the replay engine reacts to.
///
/// `Ignored` stands in for every feed kind that carries no book state
/// (trade reports, system events, ...). The decoder passes those records
/// through unchanged and the engine skips them without sampling latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Add,
    Cancel,
    Execute,
    Replace,
    Ignored,
}

impl MessageKind {
    /// Map the feed's single-character message codes onto book-relevant kinds.
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => MessageKind::Add,
            'C' => MessageKind::Cancel,
            'E' => MessageKind::Execute,
            'U' => MessageKind::Replace,
            _ => MessageKind::Ignored,
        }
    }

    /// Static label for metrics and logging.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Add => "add",
            MessageKind::Cancel => "cancel",
            MessageKind::Execute => "execute",
            MessageKind::Replace => "replace",
            MessageKind::Ignored => "ignored",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Replacement fields carried only by `Replace` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

/// One decoded order-lifecycle record.
///
/// Mirrors the decoder's column set: a flat record whose optional fields
/// (`side`, `replacement`) are `None` exactly when the feed marks them
/// not-applicable for the message kind. `price` 0 is a valid literal only
/// for kinds that carry no price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Nanoseconds since the feed's reference epoch; the input ordering key.
    pub timestamp: u64,
    pub order_id: OrderId,
    pub side: Option<Side>,
    pub price: Price,
    pub quantity: Quantity,
    pub kind: MessageKind,
    pub instrument: String,
    pub replacement: Option<Replacement>,
}

impl Event {
    pub fn add(
        timestamp: u64,
        order_id: OrderId,
        instrument: impl Into<String>,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            timestamp,
            order_id,
            side: Some(side),
            price,
            quantity,
            kind: MessageKind::Add,
            instrument: instrument.into(),
            replacement: None,
        }
    }

    pub fn cancel(timestamp: u64, order_id: OrderId, instrument: impl Into<String>) -> Self {
        Self {
            timestamp,
            order_id,
            side: None,
            price: 0,
            quantity: 0,
            kind: MessageKind::Cancel,
            instrument: instrument.into(),
            replacement: None,
        }
    }

    pub fn execute(
        timestamp: u64,
        order_id: OrderId,
        instrument: impl Into<String>,
        quantity: Quantity,
    ) -> Self {
        Self {
            timestamp,
            order_id,
            side: None,
            price: 0,
            quantity,
            kind: MessageKind::Execute,
            instrument: instrument.into(),
            replacement: None,
        }
    }

    pub fn replace(
        timestamp: u64,
        order_id: OrderId,
        instrument: impl Into<String>,
        new_order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Self {
        Self {
            timestamp,
            order_id,
            side: None,
            price: 0,
            quantity: 0,
            kind: MessageKind::Replace,
            instrument: instrument.into(),
            replacement: Some(Replacement {
                order_id: new_order_id,
                price: new_price,
                quantity: new_quantity,
            }),
        }
    }

    pub fn ignored(timestamp: u64, instrument: impl Into<String>) -> Self {
        Self {
            timestamp,
            order_id: 0,
            side: None,
            price: 0,
            quantity: 0,
            kind: MessageKind::Ignored,
            instrument: instrument.into(),
            replacement: None,
        }
    }
}

/// A resting order inside one book, keyed externally by its order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOrder {
    pub price: Price,
    pub quantity: Quantity,
    pub side: Side,
}

/// Counters for feed conditions a book absorbs without failing.
///
/// Cancel/execute/replace can legitimately reference orders that resolved
/// before the replay window opened; those stay silent no-ops and only show
/// up here.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyCounters {
    pub duplicate_adds: u64,
    pub unknown_cancels: u64,
    pub unknown_executes: u64,
    pub unknown_replaces: u64,
}

impl AnomalyCounters {
    pub fn total(&self) -> u64 {
        self.duplicate_adds + self.unknown_cancels + self.unknown_executes + self.unknown_replaces
    }

    pub fn accumulate(&mut self, other: &AnomalyCounters) {
        self.duplicate_adds += other.duplicate_adds;
        self.unknown_cancels += other.unknown_cancels;
        self.unknown_executes += other.unknown_executes;
        self.unknown_replaces += other.unknown_replaces;
    }
}

/// Read-only view of one instrument's live orders and both level maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub orders: Vec<OrderInfo>,
    pub bids: Vec<PriceLevelInfo>,
    pub asks: Vec<PriceLevelInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevelInfo {
    pub price: Price,
    pub quantity: Quantity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_from_code() {
        assert_eq!(MessageKind::from_code('A'), MessageKind::Add);
        assert_eq!(MessageKind::from_code('C'), MessageKind::Cancel);
        assert_eq!(MessageKind::from_code('E'), MessageKind::Execute);
        assert_eq!(MessageKind::from_code('U'), MessageKind::Replace);
        assert_eq!(MessageKind::from_code('P'), MessageKind::Ignored);
        assert_eq!(MessageKind::from_code('X'), MessageKind::Ignored);
    }

    #[test]
    fn test_add_event_carries_side_and_price() {
        let event = Event::add(10, 42, "AAPL", Side::Buy, 15000, 100);

        assert_eq!(event.kind, MessageKind::Add);
        assert_eq!(event.side, Some(Side::Buy));
        assert_eq!(event.price, 15000);
        assert_eq!(event.quantity, 100);
        assert!(event.replacement.is_none());
    }

    #[test]
    fn test_cancel_event_omits_side() {
        let event = Event::cancel(10, 42, "AAPL");

        assert_eq!(event.kind, MessageKind::Cancel);
        assert_eq!(event.side, None);
        assert_eq!(event.price, 0);
    }

    #[test]
    fn test_replace_event_carries_replacement() {
        let event = Event::replace(10, 42, "AAPL", 43, 15100, 50);

        let replacement = event.replacement.expect("replace carries replacement");
        assert_eq!(replacement.order_id, 43);
        assert_eq!(replacement.price, 15100);
        assert_eq!(replacement.quantity, 50);
    }

    #[test]
    fn test_anomaly_counter_accumulate() {
        let mut totals = AnomalyCounters::default();
        let per_book = AnomalyCounters {
            duplicate_adds: 1,
            unknown_cancels: 2,
            unknown_executes: 3,
            unknown_replaces: 4,
        };

        totals.accumulate(&per_book);
        totals.accumulate(&per_book);

        assert_eq!(totals.total(), 20);
        assert_eq!(totals.unknown_executes, 6);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::replace(10, 42, "AAPL", 43, 15100, 50);
        let serialized = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(event, deserialized);
    }
}
