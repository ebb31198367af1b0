use std::fmt;

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    book::SideBook,
    errors::EngineError,
    orders::{Order, OrderType, Side},
    price::Price,
    settlement::{Fill, SettlementBuffer},
};

/// Price and volume of the most recent fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastTrade {
    pub price: Price,
    pub volume: u64,
}

/// Price-time priority matching over a dual-sided book.
///
/// Incoming orders pass through a single `fill` loop; whatever the loop
/// cannot fill (a protective price that moved out of range, or a priced
/// order that ran the opposite side dry) is rested once as a limit order.
/// There is no recursion between the limit and market paths.
#[derive(Debug)]
pub struct MatchingEngine {
    bids: SideBook,
    asks: SideBook,
    settlement: SettlementBuffer,
    last_trade: Option<LastTrade>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        MatchingEngine {
            bids: SideBook::new(Side::Buy),
            asks: SideBook::new(Side::Sell),
            settlement: SettlementBuffer::new(),
            last_trade: None,
        }
    }

    /// Accept an order: validate, stamp arrival time, dispatch by type.
    ///
    /// On `InvalidOrder` the book is untouched. On `NoLiquidity` the fills
    /// already emitted stay in the settlement buffer; there is no rollback.
    pub fn submit(&mut self, mut order: Order) -> Result<(), EngineError> {
        Self::validate(&order)?;
        if order.timestamp.is_none() {
            order.timestamp = Some(Utc::now());
        }
        debug!(order = %order, "accepted order");
        match order.order_type {
            OrderType::Limit => self.handle_limit(order),
            OrderType::Market => self.handle_market(order),
        }
    }

    fn validate(order: &Order) -> Result<(), EngineError> {
        if order.quantity == 0 {
            return Err(EngineError::InvalidOrder("quantity must be > 0".into()));
        }
        if order.order_type == OrderType::Limit && order.price.is_none() {
            return Err(EngineError::InvalidOrder("limit order requires a price".into()));
        }
        if let Some(price) = order.price
            && price.ticks() == 0
        {
            return Err(EngineError::InvalidOrder("price must be positive".into()));
        }
        Ok(())
    }

    fn handle_limit(&mut self, order: Order) -> Result<(), EngineError> {
        if self.crossed_spread(&order) {
            match self.fill(order)? {
                Some(residual) => self.rest(residual),
                None => Ok(()),
            }
        } else {
            self.rest(order)
        }
    }

    fn handle_market(&mut self, order: Order) -> Result<(), EngineError> {
        match self.fill(order)? {
            Some(residual) => self.rest(residual),
            None => Ok(()),
        }
    }

    /// Strict crossing test: a BUY crosses only above the best ask, a SELL
    /// only below the best bid. An empty opposite side never crosses.
    fn crossed_spread(&self, order: &Order) -> bool {
        let Some(price) = order.price else {
            return false;
        };
        match order.side {
            Side::Buy => self.asks.best_price().is_some_and(|best_ask| price > best_ask),
            Side::Sell => self.bids.best_price().is_some_and(|best_bid| price < best_bid),
        }
    }

    /// Match `order` against the opposite side until it is exhausted.
    ///
    /// Returns `Ok(Some(residual))` when matching must stop but the order
    /// carries a price it can rest at; `Ok(None)` when fully filled. A
    /// price-less market order that meets an empty opposite side fails with
    /// `NoLiquidity`. Trades execute at the resting order's price.
    fn fill(&mut self, mut order: Order) -> Result<Option<Order>, EngineError> {
        while order.quantity > 0 {
            let opposite = match order.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };

            // Emptiness first: a protective price on an empty book rests,
            // a bare market order fails.
            let Some(counter) = opposite.best_order() else {
                if order.price.is_some() {
                    return Ok(Some(order));
                }
                return Err(EngineError::NoLiquidity);
            };
            let Some(counter_price) = counter.price else {
                return Err(EngineError::InvalidOrder(
                    "resting order has no price".into(),
                ));
            };

            // Protective limit: stop once the counterprice moves out of range.
            if let Some(limit) = order.price {
                let outside = match order.side {
                    Side::Buy => limit < counter_price,
                    Side::Sell => limit > counter_price,
                };
                if outside {
                    return Ok(Some(order));
                }
            }

            let counter_quantity = counter.quantity;
            let counter_account = counter.account_id.clone();
            let matched = order.quantity.min(counter_quantity);

            if counter_quantity > order.quantity {
                opposite.reduce_best_quantity(matched);
            } else {
                opposite.pop_best_order();
            }

            self.record_fill(&order, counter_account, counter_price, matched);
            order.quantity -= matched;
        }
        Ok(None)
    }

    /// Rest the (remainder of an) order on its own side as a limit order.
    fn rest(&mut self, mut order: Order) -> Result<(), EngineError> {
        order.order_type = OrderType::Limit;
        debug!(order = %order, "resting order");
        let book = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book.insert(order)
    }

    fn record_fill(&mut self, incoming: &Order, counter_account: String, price: Price, quantity: u64) {
        let (buy_account_id, sell_account_id) = match incoming.side {
            Side::Buy => (incoming.account_id.clone(), counter_account),
            Side::Sell => (counter_account, incoming.account_id.clone()),
        };
        info!(
            side = %incoming.side,
            quantity,
            price = %price,
            buyer = %buy_account_id,
            seller = %sell_account_id,
            "fill"
        );
        self.settlement.append(Fill {
            buy_account_id,
            sell_account_id,
            price,
            quantity,
        });
        self.last_trade = Some(LastTrade { price, volume: quantity });
    }

    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.best_order()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.best_order()
    }

    pub fn last_trade(&self) -> Option<LastTrade> {
        self.last_trade
    }

    pub fn settlement(&self) -> &SettlementBuffer {
        &self.settlement
    }

    /// Drain the settlement buffer; see [`SettlementBuffer::flush`].
    pub fn flush_settlement(&mut self) -> Vec<Fill> {
        self.settlement.flush()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-column depth view, highest price first. Routed orders get this dumped
/// at debug level.
impl fmt::Display for MatchingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>9}  {:>9}  {:<9}", "bid vol", "price", "ask vol")?;
        let mut prices = self.bids.prices_desc();
        prices.extend(self.asks.prices_desc());
        prices.sort_unstable_by(|a, b| b.cmp(a));
        prices.dedup();
        for price in prices {
            let bid = self
                .bids
                .volume_at(price)
                .map(|v| v.to_string())
                .unwrap_or_default();
            let ask = self
                .asks
                .volume_at(price)
                .map(|v| v.to_string())
                .unwrap_or_default();
            writeln!(f, "{bid:>9}  {:>9}  {ask:<9}", price.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(account: &str, side: Side, ticks: u64, quantity: u64) -> Order {
        Order::limit(account, side, quantity, Price::from_ticks(ticks))
    }

    #[test]
    fn non_crossing_limit_rests_at_tail() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10100, 100)).unwrap();
        engine.submit(limit("2", Side::Sell, 10100, 50)).unwrap();

        let level = engine.asks().level(Price::from_ticks(10100)).unwrap();
        let accounts: Vec<&str> = level.iter().map(|o| o.account_id.as_str()).collect();
        assert_eq!(accounts, vec!["1", "2"]);
        assert!(engine.settlement().is_empty());
    }

    #[test]
    fn buy_at_exactly_best_ask_rests_instead_of_trading() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10010, 100)).unwrap();
        engine.submit(limit("2", Side::Buy, 10010, 100)).unwrap();

        // Strict inequality: equality does not cross, the market locks.
        assert!(engine.settlement().is_empty());
        assert_eq!(engine.best_bid().unwrap().account_id, "2");
        assert_eq!(engine.best_ask().unwrap().account_id, "1");
    }

    #[test]
    fn crossing_buy_fills_at_resting_price() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10050, 50)).unwrap();
        engine.submit(limit("2", Side::Buy, 11000, 30)).unwrap();

        let fills = engine.settlement().fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, Price::from_ticks(10050));
        assert_eq!(fills[0].quantity, 30);
        assert_eq!(fills[0].buy_account_id, "2");
        assert_eq!(fills[0].sell_account_id, "1");

        // No resting bid at 110.00; the remainder stayed on the ask
        assert!(engine.bids().is_empty());
        assert_eq!(engine.best_ask().unwrap().quantity, 20);
    }

    #[test]
    fn market_sweeps_levels_in_price_order() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10100, 50)).unwrap();
        engine.submit(limit("2", Side::Sell, 10200, 30)).unwrap();

        engine.submit(Order::market("9", Side::Buy, 60)).unwrap();

        let fills = engine.settlement().fills();
        assert_eq!(fills.len(), 2);
        assert_eq!((fills[0].price.ticks(), fills[0].quantity), (10100, 50));
        assert_eq!((fills[1].price.ticks(), fills[1].quantity), (10200, 10));
        assert_eq!(engine.best_ask().unwrap().quantity, 20);
        assert_eq!(
            engine.last_trade(),
            Some(LastTrade { price: Price::from_ticks(10200), volume: 10 })
        );
    }

    #[test]
    fn market_exactly_consuming_book_leaves_it_empty_without_error() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Buy, 10000, 40)).unwrap();

        engine.submit(Order::market("9", Side::Sell, 40)).unwrap();

        assert!(engine.bids().is_empty());
        assert!(engine.asks().is_empty());
        assert_eq!(engine.settlement().len(), 1);
    }

    #[test]
    fn market_with_residual_and_empty_side_fails_but_keeps_fills() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Buy, 10000, 40)).unwrap();

        let result = engine.submit(Order::market("9", Side::Sell, 100));
        assert!(matches!(result, Err(EngineError::NoLiquidity)));

        // The partial fill before exhaustion is retained
        let fills = engine.settlement().fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].quantity, 40);
        assert!(engine.bids().is_empty());
    }

    #[test]
    fn market_on_empty_book_fails_with_no_liquidity() {
        let mut engine = MatchingEngine::new();
        let result = engine.submit(Order::market("9", Side::Sell, 100));
        assert!(matches!(result, Err(EngineError::NoLiquidity)));
        assert!(engine.settlement().is_empty());
    }

    #[test]
    fn crossing_limit_rests_residual_at_its_price() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10010, 50)).unwrap();

        // Crosses, eats the whole ask side, then rests the remainder
        engine.submit(limit("2", Side::Buy, 10020, 80)).unwrap();

        assert_eq!(engine.settlement().len(), 1);
        assert!(engine.asks().is_empty());
        let best_bid = engine.best_bid().unwrap();
        assert_eq!(best_bid.account_id, "2");
        assert_eq!(best_bid.quantity, 30);
        assert_eq!(best_bid.price, Some(Price::from_ticks(10020)));
        assert_eq!(best_bid.order_type, OrderType::Limit);
    }

    #[test]
    fn protective_price_stops_matching_mid_sweep() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10010, 50)).unwrap();
        engine.submit(limit("2", Side::Sell, 10030, 50)).unwrap();

        // Crosses 100.10 but may not trade above 100.20
        engine.submit(limit("3", Side::Buy, 10020, 80)).unwrap();

        let fills = engine.settlement().fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, Price::from_ticks(10010));
        assert_eq!(fills[0].quantity, 50);

        let best_bid = engine.best_bid().unwrap();
        assert_eq!(best_bid.quantity, 30);
        assert_eq!(best_bid.price, Some(Price::from_ticks(10020)));
        assert_eq!(engine.best_ask().unwrap().price, Some(Price::from_ticks(10030)));
    }

    #[test]
    fn fifo_fairness_within_a_level() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("first", Side::Sell, 10000, 40)).unwrap();
        engine.submit(limit("second", Side::Sell, 10000, 60)).unwrap();

        engine.submit(Order::market("9", Side::Buy, 90)).unwrap();

        let fills = engine.settlement().fills();
        assert_eq!(fills[0].sell_account_id, "first");
        assert_eq!(fills[0].quantity, 40);
        assert_eq!(fills[1].sell_account_id, "second");
        assert_eq!(fills[1].quantity, 50);
        assert_eq!(engine.best_ask().unwrap().quantity, 10);
    }

    #[test]
    fn invalid_orders_leave_the_book_unchanged() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10010, 100)).unwrap();

        let missing_price = Order {
            price: None,
            ..limit("2", Side::Buy, 10010, 100)
        };
        assert!(matches!(
            engine.submit(missing_price),
            Err(EngineError::InvalidOrder(_))
        ));

        let zero_quantity = limit("3", Side::Buy, 10000, 0);
        assert!(matches!(
            engine.submit(zero_quantity),
            Err(EngineError::InvalidOrder(_))
        ));

        assert!(engine.bids().is_empty());
        assert_eq!(engine.asks().depth(), 1);
        assert!(engine.settlement().is_empty());
    }

    #[test]
    fn submit_stamps_missing_timestamp() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Buy, 10000, 10)).unwrap();
        assert!(engine.best_bid().unwrap().timestamp.is_some());
    }

    #[test]
    fn fill_conserves_shares() {
        let mut engine = MatchingEngine::new();
        engine.submit(limit("1", Side::Sell, 10010, 70)).unwrap();
        engine.submit(Order::market("9", Side::Buy, 30)).unwrap();

        let resting = engine.best_ask().unwrap().quantity;
        let filled: u64 = engine.settlement().fills().iter().map(|f| f.quantity).sum();
        assert_eq!(resting + filled, 70);
    }
}
