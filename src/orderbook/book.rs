use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::orderbook::price_level::PriceLevels;
use crate::orderbook::types::{
    AnomalyCounters, BookSnapshot, LiveOrder, OrderId, OrderInfo, Price, PriceLevelInfo, Quantity,
    Side,
};

/// Per-instrument book state reconstructed from lifecycle events.
///
/// Holds the live-order map and both price-level aggregates; every
/// operation is a constant number of map lookups, no path iterates the
/// full order or level set.
#[derive(Debug)]
pub struct OrderBook {
    pub symbol: String,

    // Live resting orders: OrderId -> LiveOrder
    live: HashMap<OrderId, LiveOrder>,

    // Derived aggregates: Price -> total resting quantity
    bids: PriceLevels,
    asks: PriceLevels,

    anomalies: AnomalyCounters,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        info!("Creating new order book for symbol: {}", symbol);

        Self {
            symbol,
            live: HashMap::new(),
            bids: PriceLevels::new(),
            asks: PriceLevels::new(),
            anomalies: AnomalyCounters::default(),
        }
    }

    /// Insert a new resting order and accrue its quantity to the side's level.
    ///
    /// An add naming an id that is already live overwrites it; the stale
    /// entry's level contribution is retracted first so the aggregates stay
    /// exact.
    pub fn add(&mut self, order_id: OrderId, side: Side, price: Price, quantity: Quantity) {
        debug!(
            "{}: add order {} {} {}@{}",
            self.symbol, order_id, side, quantity, price
        );

        if let Some(previous) = self.live.insert(order_id, LiveOrder { price, quantity, side }) {
            warn!(
                "{}: duplicate add for live order {}, overwriting",
                self.symbol, order_id
            );
            self.anomalies.duplicate_adds += 1;
            self.side_levels_mut(previous.side)
                .retract(previous.price, previous.quantity);
        }

        self.side_levels_mut(side).accrue(price, quantity);
    }

    /// Remove a resting order. Unknown ids are already-resolved orders from
    /// before the replay window and stay silent no-ops.
    pub fn cancel(&mut self, order_id: OrderId) {
        let Some(order) = self.live.remove(&order_id) else {
            self.anomalies.unknown_cancels += 1;
            return;
        };

        self.side_levels_mut(order.side)
            .retract(order.price, order.quantity);
    }

    /// Consume quantity from a resting order, removing it when exhausted.
    ///
    /// The executed quantity is clamped to what is resting, so neither the
    /// order nor its level aggregate can go negative.
    pub fn execute(&mut self, order_id: OrderId, executed_quantity: Quantity) {
        let Some(order) = self.live.get_mut(&order_id) else {
            self.anomalies.unknown_executes += 1;
            return;
        };

        let decrement = executed_quantity.min(order.quantity);
        order.quantity -= decrement;
        let LiveOrder { price, quantity, side } = *order;

        if quantity == 0 {
            self.live.remove(&order_id);
        }
        self.side_levels_mut(side).retract(price, decrement);
    }

    /// Atomically cancel an order and re-add it under a new id, price and
    /// quantity, preserving the side of the original.
    pub fn replace(
        &mut self,
        order_id: OrderId,
        new_order_id: OrderId,
        new_price: Price,
        new_quantity: Quantity,
    ) {
        debug!(
            "{}: replace order {} -> {} {}@{}",
            self.symbol, order_id, new_order_id, new_quantity, new_price
        );

        let Some(order) = self.live.get(&order_id) else {
            self.anomalies.unknown_replaces += 1;
            return;
        };
        let side = order.side;

        self.cancel(order_id);
        self.add(new_order_id, side, new_price, new_quantity);
    }

    /// Number of live resting orders.
    pub fn order_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_order(&self, order_id: OrderId) -> Option<&LiveOrder> {
        self.live.get(&order_id)
    }

    pub fn live_orders(&self) -> impl Iterator<Item = (OrderId, &LiveOrder)> + '_ {
        self.live.iter().map(|(id, order)| (*id, order))
    }

    pub fn bid_levels(&self) -> &PriceLevels {
        &self.bids
    }

    pub fn ask_levels(&self) -> &PriceLevels {
        &self.asks
    }

    pub fn side_levels(&self, side: Side) -> &PriceLevels {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn anomalies(&self) -> &AnomalyCounters {
        &self.anomalies
    }

    /// Get current best bid price
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.highest()
    }

    /// Get current best ask price
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.lowest()
    }

    /// Get current spread
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Generate a read-only snapshot of the live orders and both level maps.
    pub fn snapshot(&self) -> BookSnapshot {
        let mut orders: Vec<OrderInfo> = self
            .live
            .iter()
            .map(|(order_id, order)| OrderInfo {
                order_id: *order_id,
                side: order.side,
                price: order.price,
                quantity: order.quantity,
            })
            .collect();
        orders.sort_by_key(|order| order.order_id);

        let mut bids: Vec<PriceLevelInfo> = self
            .bids
            .iter()
            .map(|(price, quantity)| PriceLevelInfo { price, quantity })
            .collect();
        let mut asks: Vec<PriceLevelInfo> = self
            .asks
            .iter()
            .map(|(price, quantity)| PriceLevelInfo { price, quantity })
            .collect();

        // Sort bids by price descending (highest first)
        bids.sort_by(|a, b| b.price.cmp(&a.price));

        // Sort asks by price ascending (lowest first)
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        BookSnapshot {
            symbol: self.symbol.clone(),
            timestamp: chrono::Utc::now(),
            orders,
            bids,
            asks,
        }
    }

    /// Get statistics
    pub fn stats(&self) -> BookStats {
        BookStats {
            symbol: self.symbol.clone(),
            live_orders: self.live.len(),
            bid_levels: self.bids.len(),
            ask_levels: self.asks.len(),
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
            spread: self.spread(),
            bid_quantity: self.bids.total_quantity(),
            ask_quantity: self.asks.total_quantity(),
            anomalies: self.anomalies,
        }
    }

    /// Recompute both level maps from the live orders and compare.
    ///
    /// Verification hook: true iff every present price equals the sum of
    /// live-order quantities at that price/side and no price maps to zero.
    pub fn verify_aggregates(&self) -> bool {
        let mut expected_bids: HashMap<Price, Quantity> = HashMap::new();
        let mut expected_asks: HashMap<Price, Quantity> = HashMap::new();

        for order in self.live.values() {
            let expected = match order.side {
                Side::Buy => &mut expected_bids,
                Side::Sell => &mut expected_asks,
            };
            *expected.entry(order.price).or_insert(0) += order.quantity;
        }
        expected_bids.retain(|_, quantity| *quantity != 0);
        expected_asks.retain(|_, quantity| *quantity != 0);

        let actual_bids: HashMap<Price, Quantity> = self.bids.iter().collect();
        let actual_asks: HashMap<Price, Quantity> = self.asks.iter().collect();

        expected_bids == actual_bids && expected_asks == actual_asks
    }

    fn side_levels_mut(&mut self, side: Side) -> &mut PriceLevels {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookStats {
    pub symbol: String,
    pub live_orders: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Option<Price>,
    pub bid_quantity: Quantity,
    pub ask_quantity: Quantity,
    pub anomalies: AnomalyCounters,
}
