use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::price::Price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the side an incoming order matches against.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// A single order as it travels from an agent to the book.
///
/// Identity (`account_id`, side, type, price) is fixed at creation;
/// `quantity` is the remaining open interest and shrinks in place as the
/// matching engine fills it. `price` must be present for limit orders and,
/// when present on a market order, acts as a protective limit. A missing
/// `timestamp` is stamped by the engine at acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub account_id: String,
    pub side: Side,
    pub quantity: u64,
    pub order_type: OrderType,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Order {
    /// A limit order, timestamp left for the engine to assign.
    pub fn limit(account_id: impl Into<String>, side: Side, quantity: u64, price: Price) -> Self {
        Order {
            account_id: account_id.into(),
            side,
            quantity,
            order_type: OrderType::Limit,
            price: Some(price),
            timestamp: None,
        }
    }

    /// A market order with no protective price.
    pub fn market(account_id: impl Into<String>, side: Side, quantity: u64) -> Self {
        Order {
            account_id: account_id.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            price: None,
            timestamp: None,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.order_type, self.price) {
            (OrderType::Market, None) => {
                write!(f, "({} {} {} MARKET)", self.account_id, self.side, self.quantity)
            }
            (_, Some(price)) => write!(
                f,
                "({} {} {} {:?} ${price})",
                self.account_id, self.side, self.quantity, self.order_type
            ),
            (OrderType::Limit, None) => {
                write!(f, "({} {} {} LIMIT ?)", self.account_id, self.side, self.quantity)
            }
        }
    }
}
