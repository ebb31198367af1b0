use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::price::Price;

/// One matched quantity at a single price, ready for settlement.
///
/// The price always comes from the resting order; the incoming side gets the
/// price improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub buy_account_id: String,
    pub sell_account_id: String,
    pub price: Price,
    pub quantity: u64,
}

impl Fill {
    /// A fill where one account traded with itself; nothing nets.
    pub fn is_self_trade(&self) -> bool {
        self.buy_account_id == self.sell_account_id
    }
}

/// Collects fills as the engine emits them and clears them on demand.
///
/// Self-trades stay in the buffer (they are real book events) but are
/// discarded at flush time rather than settled.
#[derive(Debug, Default)]
pub struct SettlementBuffer {
    fills: Vec<Fill>,
}

impl SettlementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fill: Fill) {
        self.fills.push(fill);
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Drain the buffer, returning the fills that settle. Self-trades are
    /// skipped and dropped.
    pub fn flush(&mut self) -> Vec<Fill> {
        let drained = std::mem::take(&mut self.fills);
        let mut settled = Vec::with_capacity(drained.len());
        for fill in drained {
            if fill.is_self_trade() {
                debug!(account = %fill.buy_account_id, quantity = fill.quantity, "skipping self-trade at settlement");
                continue;
            }
            info!(
                quantity = fill.quantity,
                from = %fill.sell_account_id,
                to = %fill.buy_account_id,
                price = %fill.price,
                notional = format_args!("{:.2}", fill.quantity as f64 * fill.price.as_major()),
                "settling fill"
            );
            settled.push(fill);
        }
        settled
    }
}
