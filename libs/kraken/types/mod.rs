//! Domain types shared across the engine.

use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation used by Kraken ("buy" / "sell")
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side: {}", other)),
        }
    }
}

/// One desired price level of a ladder.
///
/// Immutable value, recomputed fresh each cycle and discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rung {
    pub side: Side,
    pub price: f64,
    pub size: f64,
}

impl Rung {
    pub fn new(side: Side, price: f64, size: f64) -> Self {
        Self { side, price, size }
    }

    /// Absolute price distance from a reference price
    pub fn distance_from(&self, reference: f64) -> f64 {
        (self.price - reference).abs()
    }
}

/// Desired order set for one cycle: up to N rungs per side, each side sorted
/// by distance from the reference price ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    pub reference_price: f64,
    pub bids: Vec<Rung>,
    pub asks: Vec<Rung>,
}

impl Ladder {
    pub fn empty(reference_price: f64) -> Self {
        Self {
            reference_price,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn side(&self, side: Side) -> &[Rung] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn rung_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

/// Lifecycle status of a live order.
///
/// `Closed` and `Rejected` are terminal; the live set purges them before the
/// next reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Sent to the venue, not yet confirmed
    Pending,
    /// Resting on the book
    Open,
    /// An edit is in flight
    Editing,
    /// A cancel is in flight
    Canceling,
    /// Filled or canceled
    Closed,
    /// Refused by the venue
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses are purged from the live set between cycles
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Rejected)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Open => "open",
            OrderStatus::Editing => "editing",
            OrderStatus::Canceling => "canceling",
            OrderStatus::Closed => "closed",
            OrderStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// A live order as tracked by the execution engine.
///
/// `id` is venue-assigned and absent only while a placement is unconfirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<String>,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub status: OrderStatus,
}

impl Order {
    pub fn open(id: impl Into<String>, side: Side, price: f64, size: f64) -> Self {
        Self {
            id: Some(id.into()),
            side,
            price,
            size,
            status: OrderStatus::Open,
        }
    }

    /// A placement in flight: no venue id yet, holds its slot until the
    /// ack (or failure) resolves it.
    pub fn pending(side: Side, price: f64, size: f64) -> Self {
        Self {
            id: None,
            side,
            price,
            size,
            status: OrderStatus::Pending,
        }
    }

    /// Absolute price distance from a reference price
    pub fn distance_from(&self, reference: f64) -> f64 {
        (self.price - reference).abs()
    }
}

/// Account balance snapshot, read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Base asset amount (e.g. XBT)
    pub asset_amount: f64,
    /// Quote currency amount (e.g. USD)
    pub currency_amount: f64,
}

impl Balances {
    pub fn new(asset_amount: f64, currency_amount: f64) -> Self {
        Self {
            asset_amount,
            currency_amount,
        }
    }
}
