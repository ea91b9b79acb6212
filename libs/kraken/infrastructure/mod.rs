//! Cross-cutting infrastructure: rate limiting, configuration, logging.

pub mod config;
pub mod logging;
pub mod rate_limit;

pub use config::{ConfigError, MarketMakerConfig};
pub use logging::init_tracing;
pub use rate_limit::{RateLimitError, RateLimiter};
