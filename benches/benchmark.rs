use criterion::{Criterion, criterion_group, criterion_main};

use agent_market::market::MarketState;
use agent_market::orders::{Order, Side};
use agent_market::price::Price;
use agent_market::seed;

fn setup_market(depth: u64, orders_per_level: u64) -> MarketState {
    let (mut market, _rx) = MarketState::new(1024);
    // Asks stacked above 100.00, bids below, symmetric depth
    for step in 1..=depth {
        for i in 0..orders_per_level {
            let _ = market.submit(Order::limit(
                format!("s{step}-{i}"),
                Side::Sell,
                10,
                Price::from_ticks(10_000 + step),
            ));
            let _ = market.submit(Order::limit(
                format!("b{step}-{i}"),
                Side::Buy,
                10,
                Price::from_ticks(10_000 - step),
            ));
        }
    }
    market
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    let mut market = setup_market(depth, orders_per_level);
    c.bench_function("match 1 market order", |b| {
        b.iter(|| {
            let _ = market.submit(Order::market("taker", Side::Buy, 50));
        })
    });

    let mut market = setup_market(depth, orders_per_level);
    c.bench_function("match 1 crossing limit order", |b| {
        b.iter(|| {
            let _ = market.submit(Order::limit(
                "crosser",
                Side::Sell,
                50,
                Price::from_ticks(9_990),
            ));
        })
    });
}

fn bench_populate(c: &mut Criterion) {
    c.bench_function("populate 1000 random limits", |b| {
        b.iter(|| {
            let (mut market, _rx) = MarketState::new(1024);
            seed::populate_randomly(&mut market, Price::from_ticks(10_000), 0.005, 1000).unwrap();
        })
    });
}

criterion_group!(benches, bench_match_order, bench_populate);
criterion_main!(benches);
