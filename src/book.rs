use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    errors::EngineError,
    level::PriceLevelQueue,
    orders::{Order, Side},
    price::Price,
};

/// One side of the book: an ordered map from price to the FIFO queue of
/// resting orders at that price.
///
/// The `BTreeMap` doubles as price index and level mapping, so "index and
/// mapping in lock-step" reduces to a single rule: an empty queue is evicted
/// the moment its last order pops. Which end of the map is "best" depends on
/// the side the book was built for (highest bid, lowest ask); callers never
/// see the comparator.
#[derive(Debug)]
pub struct SideBook {
    side: Side,
    levels: BTreeMap<Price, PriceLevelQueue>,
}

impl SideBook {
    pub fn new(side: Side) -> Self {
        SideBook {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Rest an order at its price level, creating the level if absent.
    /// O(log P) in the number of distinct price levels.
    pub fn insert(&mut self, order: Order) -> Result<(), EngineError> {
        let price = order
            .price
            .ok_or_else(|| EngineError::InvalidOrder("resting order requires a price".into()))?;
        self.levels.entry(price).or_default().append(order);
        Ok(())
    }

    /// The most favorable resting price: max for bids, min for asks.
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(price, _)| *price),
            Side::Sell => self.levels.first_key_value().map(|(price, _)| *price),
        }
    }

    /// Head order at the best price, if any.
    pub fn best_order(&self) -> Option<&Order> {
        let price = self.best_price()?;
        self.levels.get(&price).and_then(|queue| queue.head().ok())
    }

    /// Remove and return the head order at the best price, evicting the
    /// price level if the queue empties.
    pub fn pop_best_order(&mut self) -> Option<Order> {
        let price = self.best_price()?;
        let queue = self.levels.get_mut(&price)?;
        let order = queue.pop_head().ok()?;
        if queue.is_empty() {
            self.levels.remove(&price);
            debug!(side = %self.side, price = %price, "evicted empty price level");
        }
        Some(order)
    }

    /// Shrink the best order's quantity in place after a partial fill.
    /// The caller guarantees `delta < head.quantity`, so the order stays in
    /// its queue with a positive remainder.
    pub fn reduce_best_quantity(&mut self, delta: u64) {
        let Some(price) = self.best_price() else {
            return;
        };
        if let Some(queue) = self.levels.get_mut(&price)
            && let Ok(head) = queue.head_mut()
        {
            debug_assert!(delta < head.quantity);
            head.quantity -= delta;
        }
    }

    /// Total open quantity at a price, or `None` if the level is absent.
    pub fn volume_at(&self, price: Price) -> Option<u64> {
        self.levels.get(&price).map(PriceLevelQueue::volume)
    }

    /// Price levels from highest to lowest, for depth views and snapshots.
    pub fn prices_desc(&self) -> Vec<Price> {
        self.levels.keys().rev().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of distinct price levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevelQueue> {
        self.levels.get(&price)
    }
}
