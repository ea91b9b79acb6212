//! Order execution: trading transport, live-order bookkeeping, and the
//! engine that applies reconciler output to the venue.

pub mod auth;
pub mod engine;
pub mod kraken_client;
pub mod live_orders;
pub mod transport;

pub use auth::{AuthError, KrakenCredentials};
pub use engine::{ApplyReport, ExecutionEngine, RetryPolicy};
pub use kraken_client::KrakenTradingClient;
pub use live_orders::{LiveOrders, SharedLiveOrders};
pub use transport::{AccountClient, BalanceProvider, OrderAck, StaticBalances, TransportError};
