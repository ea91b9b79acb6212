//! Kraken market-data feed: typed events, frame decoding, and subscription
//! payload construction for the public WebSocket API.

pub mod decoder;
pub mod events;
pub mod subscribe;

pub use decoder::KrakenFrameDecoder;
pub use events::MarketEvent;
pub use subscribe::{book_subscription, ticker_subscription, trade_subscription};
