use rand::Rng;

use crate::{
    errors::EngineError,
    market::MarketState,
    orders::{Order, Side},
    price::Price,
    utils::mini_uuid,
};

/// Seed the deterministic test book: asks at 100.10–100.50 and bids at
/// 99.90–99.50, two 100-share orders per level. Accounts "1".."10" take the
/// asks and "11".."20" the bids, best levels first.
pub fn populate_for_testing(market: &mut MarketState) -> Result<(), EngineError> {
    let center = 10_000u64;
    let mut account = 1u32;
    for step in 1..=5u64 {
        let price = Price::from_ticks(center + step * 10);
        for _ in 0..2 {
            market.submit(Order::limit(account.to_string(), Side::Sell, 100, price))?;
            account += 1;
        }
    }
    for step in 1..=5u64 {
        let price = Price::from_ticks(center - step * 10);
        for _ in 0..2 {
            market.submit(Order::limit(account.to_string(), Side::Buy, 100, price))?;
            account += 1;
        }
    }
    Ok(())
}

/// Populate with random non-crossing limit orders around a center price:
/// buys below it, sells above it, quantities a bounded multiple of 10.
pub fn populate_randomly(
    market: &mut MarketState,
    center: Price,
    deviance: f64,
    orders: usize,
) -> Result<(), EngineError> {
    let mut rng = rand::rng();
    let center_major = center.as_major();
    for _ in 0..orders {
        let side = if rng.random_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let offset = rng.random_range(0.0..=center_major * deviance);
        let raw = match side {
            Side::Buy => center_major - offset,
            Side::Sell => center_major + offset,
        };
        let Some(price) = Price::from_major(raw) else {
            continue;
        };
        let quantity = rng.random_range(2..=50) * 10;
        market.submit(Order::limit(mini_uuid(), side, quantity, price))?;
    }
    Ok(())
}
