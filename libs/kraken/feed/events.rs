//! Typed events decoded from the market-data stream.

use crate::types::Side;

/// One decoded market-data event.
///
/// Every frame the venue sends maps to exactly one of these variants (or is
/// skipped); the strategy loop consumes them by pattern matching on a single
/// channel per feed.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    /// Top-of-book change. Sides the frame did not touch are `None`.
    BookUpdate {
        best_bid: Option<f64>,
        best_ask: Option<f64>,
    },
    /// A public trade printed on the pair
    Trade { price: f64, size: f64, side: Side },
    /// Venue keepalive; proves the session is live
    Heartbeat,
    /// Venue system status announcement ("online", "maintenance", ...)
    SystemStatus { status: String },
    /// A subscription was acknowledged
    SubscriptionAck { channel: String },
    /// The venue reported an error at the protocol level
    ProtocolError { message: String },
}

impl MarketEvent {
    /// True for events that carry price information usable as a reference
    pub fn is_price_bearing(&self) -> bool {
        matches!(
            self,
            MarketEvent::BookUpdate { .. } | MarketEvent::Trade { .. }
        )
    }
}
