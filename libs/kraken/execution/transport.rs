//! Trading transport abstraction.
//!
//! The execution engine talks to the venue through these traits so the
//! engine, reconciler, and strategy loop are testable against mocks. The
//! live implementation is [`KrakenTradingClient`](super::kraken_client::KrakenTradingClient).

use crate::types::{Balances, Order, Side};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single trading call.
///
/// The split drives retry policy: `Transient` failures are retried a small
/// fixed number of times, `Rejected` failures are venue-level verdicts
/// (insufficient funds, invalid price) and are never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transient transport error: {0}")]
    Transient(String),

    #[error("Rejected by venue: {0}")]
    Rejected(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Interrupted by shutdown")]
    Interrupted,
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }

    /// Rejection meaning the venue no longer knows the order id: it filled
    /// or was canceled out-of-band since our last sync. The resident copy
    /// is dead weight and must not keep holding its ladder rank.
    pub fn is_unknown_order(&self) -> bool {
        matches!(self, TransportError::Rejected(reason) if reason.contains("Unknown order"))
    }
}

/// Result of a successful placement or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    /// Venue-assigned transaction id. Edits return a fresh id that replaces
    /// the old one.
    pub txid: String,
}

/// Request/response trading channel to the venue.
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Place a limit order. Returns the venue-assigned id.
    async fn add_order(
        &self,
        pair: &str,
        side: Side,
        price: f64,
        volume: f64,
    ) -> Result<OrderAck, TransportError>;

    /// Amend price/volume of a resting order. Kraken assigns a new id to
    /// the amended order; the returned ack carries it.
    async fn edit_order(
        &self,
        txid: &str,
        pair: &str,
        side: Side,
        price: f64,
        volume: f64,
    ) -> Result<OrderAck, TransportError>;

    /// Cancel a resting order.
    async fn cancel_order(&self, txid: &str) -> Result<(), TransportError>;

    /// Current open orders for the pair, as the venue sees them. Used to
    /// rebuild the in-memory live set on startup.
    async fn open_orders(&self, pair: &str) -> Result<Vec<Order>, TransportError>;
}

/// Balance snapshot collaborator.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn get_balance(&self) -> Result<Balances, TransportError>;
}

/// Fixed balances from configuration.
///
/// Stands in for an account-data collaborator when the deployment allocates
/// a fixed budget to the ladder instead of quoting the whole account.
pub struct StaticBalances {
    balances: Balances,
}

impl StaticBalances {
    pub fn new(balances: Balances) -> Self {
        Self { balances }
    }
}

#[async_trait]
impl BalanceProvider for StaticBalances {
    async fn get_balance(&self) -> Result<Balances, TransportError> {
        Ok(self.balances)
    }
}
