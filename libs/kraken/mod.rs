//! # Kraken market-making library
//!
//! Order-lifecycle engine for a single trading pair on Kraken: a resilient
//! market-data feed, a pure ladder generator, a rank-pairing reconciler that
//! converges the resting order set with minimal request traffic, and an
//! execution engine that applies the result through a shared rate limiter.
//!
//! ## Architecture
//!
//! - `feed` - Kraken WebSocket frame decoding and subscription payloads
//! - `strategy` - ladder generation, reconciliation, and the strategy loop
//! - `execution` - trading transport, live-order bookkeeping, engine
//! - `infrastructure` - rate limiting, configuration, logging
//! - `utils` - shutdown management

pub mod execution;
pub mod feed;
pub mod infrastructure;
pub mod strategy;
pub mod types;
pub mod utils;

pub use execution::{AccountClient, BalanceProvider, ExecutionEngine, TransportError};
pub use feed::{KrakenFrameDecoder, MarketEvent};
pub use infrastructure::config::MarketMakerConfig;
pub use infrastructure::logging::init_tracing;
pub use infrastructure::rate_limit::RateLimiter;
pub use strategy::{MarketMaker, Strategy, StrategyContext, StrategyError};
pub use types::{Balances, Ladder, Order, OrderStatus, Rung, Side};
pub use utils::shutdown::{ShutdownFlag, ShutdownManager};
