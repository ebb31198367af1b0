//! A simulated single-symbol equities venue: a price-time priority matching
//! engine fed by autonomous trading agents over a message fabric.
//!
//! Orders flow `agent → order ingress → matching engine`, and market data
//! flows back `engine → snapshot queue → data egress → subscribers`. The
//! engine itself is single-consumer; everything around it is tokio tasks
//! tied together with cancellation tokens.

pub mod agent;
pub mod book;
pub mod config;
pub mod data_router;
pub mod engine;
pub mod errors;
pub mod level;
pub mod market;
pub mod order_router;
pub mod orchestrator;
pub mod orders;
pub mod price;
pub mod seed;
pub mod settlement;
pub mod utils;
pub mod wire;
