//! End-to-end matching scenarios against the deterministic seed book:
//! asks at 100.10–100.50 and bids at 99.90–99.50, two 100-share orders per
//! level, accounts "1".."10" on the asks and "11".."20" on the bids.

use agent_market::{
    errors::EngineError,
    market::MarketState,
    orders::{Order, OrderType, Side},
    price::Price,
    seed,
    settlement::Fill,
};

fn seeded_market() -> MarketState {
    let (mut market, _rx) = MarketState::new(256);
    seed::populate_for_testing(&mut market).unwrap();
    market
}

fn fill(buyer: &str, seller: &str, ticks: u64, quantity: u64) -> Fill {
    Fill {
        buy_account_id: buyer.into(),
        sell_account_id: seller.into(),
        price: Price::from_ticks(ticks),
        quantity,
    }
}

#[test]
fn market_sell_walks_the_bid_side() {
    let mut market = seeded_market();
    market.submit(Order::market("98", Side::Sell, 350)).unwrap();

    let fills = market.engine().settlement().fills();
    assert_eq!(
        fills,
        &[
            fill("11", "98", 9990, 100),
            fill("12", "98", 9990, 100),
            fill("13", "98", 9980, 100),
            fill("14", "98", 9980, 50),
        ]
    );

    let best_bid = market.engine().best_bid().unwrap();
    assert_eq!(best_bid.price, Some(Price::from_ticks(9980)));
    assert_eq!(best_bid.quantity, 50);
    assert_eq!(best_bid.account_id, "14");
}

#[test]
fn market_buy_after_market_sell_walks_the_ask_side() {
    let mut market = seeded_market();
    market.submit(Order::market("98", Side::Sell, 350)).unwrap();
    market.submit(Order::market("99", Side::Buy, 150)).unwrap();

    let fills = market.engine().settlement().fills();
    assert_eq!(
        &fills[4..],
        &[fill("99", "1", 10010, 100), fill("99", "2", 10010, 50)]
    );

    let best_ask = market.engine().best_ask().unwrap();
    assert_eq!(best_ask.price, Some(Price::from_ticks(10010)));
    assert_eq!(best_ask.quantity, 50);
    assert_eq!(best_ask.account_id, "2");
}

#[test]
fn crossing_limit_buy_sweeps_to_its_price_and_rests_the_rest() {
    let mut market = seeded_market();
    market.submit(Order::market("98", Side::Sell, 350)).unwrap();
    market.submit(Order::market("99", Side::Buy, 150)).unwrap();

    market
        .submit(Order::limit("97", Side::Buy, 300, Price::from_ticks(10020)))
        .unwrap();

    let fills = market.engine().settlement().fills();
    assert_eq!(
        &fills[6..],
        &[
            fill("97", "2", 10010, 50),
            fill("97", "3", 10020, 100),
            fill("97", "4", 10020, 100),
        ]
    );

    // Residual 50 rests as a limit buy at its own price
    let best_bid = market.engine().best_bid().unwrap();
    assert_eq!(best_bid.account_id, "97");
    assert_eq!(best_bid.quantity, 50);
    assert_eq!(best_bid.price, Some(Price::from_ticks(10020)));
    assert_eq!(best_bid.order_type, OrderType::Limit);

    // The ask side resumes above the swept levels
    let best_ask = market.engine().best_ask().unwrap();
    assert_eq!(best_ask.price, Some(Price::from_ticks(10030)));
}

#[test]
fn non_crossing_limit_sell_rests_without_moving_the_reference() {
    let mut market = seeded_market();
    assert_eq!(market.reference_price(), Some(100.0));

    market
        .submit(Order::limit("21", Side::Sell, 100, Price::from_ticks(10100)))
        .unwrap();

    assert!(market.engine().settlement().is_empty());
    assert_eq!(
        market.engine().asks().volume_at(Price::from_ticks(10100)),
        Some(100)
    );
    // Midpoint is still built from 100.10 and 99.90
    assert_eq!(market.reference_price(), Some(100.0));
}

#[test]
fn limit_without_price_is_rejected_and_book_unchanged() {
    let mut market = seeded_market();
    let invalid = Order {
        account_id: "42".into(),
        side: Side::Buy,
        quantity: 100,
        order_type: OrderType::Limit,
        price: None,
        timestamp: None,
    };

    let result = market.submit(invalid);
    assert!(matches!(result, Err(EngineError::InvalidOrder(_))));

    assert_eq!(market.engine().bids().depth(), 5);
    assert_eq!(market.engine().asks().depth(), 5);
    assert!(market.engine().settlement().is_empty());
}

#[test]
fn market_sell_into_empty_book_fails_cleanly() {
    let (mut market, _rx) = MarketState::new(8);
    let result = market.submit(Order::market("42", Side::Sell, 100));
    assert!(matches!(result, Err(EngineError::NoLiquidity)));
    assert!(market.engine().bids().is_empty());
    assert!(market.engine().asks().is_empty());
    assert!(market.engine().settlement().is_empty());
}

#[test]
fn settlement_flush_reports_everything_but_self_trades() {
    let mut market = seeded_market();
    market.submit(Order::market("98", Side::Sell, 350)).unwrap();
    // Account 14 lifts its own remaining bid: a self-trade
    market.submit(Order::market("14", Side::Sell, 50)).unwrap();

    assert_eq!(market.engine().settlement().len(), 5);
    let settled = market.flush_settlement();
    assert_eq!(settled.len(), 4);
    assert!(settled.iter().all(|f| !f.is_self_trade()));

    // Flush drained the buffer
    assert!(market.engine().settlement().is_empty());
}

#[test]
fn settlement_entries_are_always_positive() {
    let mut market = seeded_market();
    market.submit(Order::market("98", Side::Sell, 350)).unwrap();
    market.submit(Order::market("99", Side::Buy, 150)).unwrap();
    for fill in market.engine().settlement().fills() {
        assert!(fill.price.ticks() > 0);
        assert!(fill.quantity > 0);
    }
}
