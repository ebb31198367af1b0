use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    engine::{LastTrade, MatchingEngine},
    errors::EngineError,
    orders::Order,
    price::Price,
    settlement::Fill,
};

/// Top-of-book market data published after every accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// Midpoint of best bid and best ask when both exist, otherwise the one
    /// existing best price, in major units.
    pub reference_price: f64,
    pub last_trade_price: Option<Price>,
    pub last_trade_volume: Option<u64>,
    pub top_bid: Option<Order>,
    pub top_ask: Option<Order>,
}

/// The venue's volatile state: the matching engine (books + settlement +
/// last trade) plus the bounded snapshot queue feeding the DataRouter.
///
/// Only one task ever holds a `MarketState`; the snapshot channel is the
/// sole synchronization point with the publishing side. The channel is a
/// `broadcast` with fixed capacity, so a slow consumer loses the oldest
/// pending snapshots first.
pub struct MarketState {
    engine: MatchingEngine,
    snapshot_tx: broadcast::Sender<Snapshot>,
}

impl MarketState {
    /// Build a market with a snapshot queue of the given capacity, handing
    /// back the consumer end for a DataRouter.
    pub fn new(snapshot_capacity: usize) -> (Self, broadcast::Receiver<Snapshot>) {
        let (snapshot_tx, snapshot_rx) = broadcast::channel(snapshot_capacity);
        let state = MarketState {
            engine: MatchingEngine::new(),
            snapshot_tx,
        };
        (state, snapshot_rx)
    }

    /// Another consumer end for the snapshot queue (e.g. an in-process
    /// observer in tests).
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Submit an order to the engine, then publish exactly one snapshot.
    ///
    /// An order rejected as invalid leaves the book untouched and emits no
    /// snapshot. An order that died with `NoLiquidity` was accepted and may
    /// have moved the book through partial fills, so it still snapshots.
    pub fn submit(&mut self, order: Order) -> Result<(), EngineError> {
        let result = self.engine.submit(order);
        match result {
            Err(EngineError::InvalidOrder(_)) => {}
            _ => self.snapshot(),
        }
        result
    }

    /// Midpoint of best bid/ask, the single best price when one side is
    /// empty, `None` when the book is empty.
    pub fn reference_price(&self) -> Option<f64> {
        let bid = self.engine.bids().best_price();
        let ask = self.engine.asks().best_price();
        match (bid, ask) {
            (Some(bid), Some(ask)) => Some((bid.ticks() + ask.ticks()) as f64 / 200.0),
            (Some(bid), None) => Some(bid.as_major()),
            (None, Some(ask)) => Some(ask.as_major()),
            (None, None) => None,
        }
    }

    /// Build and enqueue a snapshot, unless the book is empty (no reference
    /// price exists then). If the queue is full the oldest pending snapshot
    /// is dropped by the channel.
    pub fn snapshot(&self) {
        let Some(reference_price) = self.reference_price() else {
            return;
        };
        let last_trade = self.engine.last_trade();
        let snapshot = Snapshot {
            timestamp: Utc::now(),
            reference_price,
            last_trade_price: last_trade.map(|t| t.price),
            last_trade_volume: last_trade.map(|t| t.volume),
            top_bid: self.engine.best_bid().cloned(),
            top_ask: self.engine.best_ask().cloned(),
        };
        // Err means no live subscriber; the snapshot is simply not observed.
        if self.snapshot_tx.send(snapshot).is_err() {
            debug!("snapshot dropped: no subscribers");
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn last_trade(&self) -> Option<LastTrade> {
        self.engine.last_trade()
    }

    /// Drain the settlement buffer; see [`crate::settlement::SettlementBuffer::flush`].
    pub fn flush_settlement(&mut self) -> Vec<Fill> {
        self.engine.flush_settlement()
    }
}
