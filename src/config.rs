use std::net::SocketAddr;
use std::time::Duration;

use crate::price::Price;

/// Wiring and behavior knobs for the whole venue.
///
/// Ports default to the 5557/5558 pair the original deployment used; tests
/// bind port 0 to get ephemeral ports from the OS.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Order ingress: the OrderRouter binds here, agents connect.
    pub order_ingress: SocketAddr,
    /// Snapshot egress: the DataRouter binds here, subscribers connect.
    pub data_egress: SocketAddr,
    /// Number of noise agents to run.
    pub agents: usize,
    /// Center of the band agents quote around.
    pub center_price: Price,
    /// Half-width of the quoting band, as a fraction of the center.
    pub deviance: f64,
    /// Agent wake interval bounds.
    pub wake_min: Duration,
    pub wake_max: Duration,
    /// Pending-snapshot queue capacity; oldest dropped when full.
    pub snapshot_capacity: usize,
    /// Optional run deadline; `None` runs until interrupted.
    pub run_secs: Option<u64>,
    /// Seed the deterministic test book before the fabric starts.
    pub seed_book: bool,
}

impl Default for VenueConfig {
    fn default() -> Self {
        VenueConfig {
            order_ingress: ([127, 0, 0, 1], 5557).into(),
            data_egress: ([127, 0, 0, 1], 5558).into(),
            agents: 3,
            center_price: Price::from_ticks(10000),
            deviance: 0.005,
            wake_min: Duration::from_secs(1),
            wake_max: Duration::from_secs(3),
            snapshot_capacity: 64,
            run_secs: None,
            seed_book: false,
        }
    }
}

impl VenueConfig {
    /// Same venue, ephemeral loopback ports. Used by tests.
    pub fn ephemeral() -> Self {
        VenueConfig {
            order_ingress: ([127, 0, 0, 1], 0).into(),
            data_egress: ([127, 0, 0, 1], 0).into(),
            ..Self::default()
        }
    }
}
