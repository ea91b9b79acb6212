//! Core client: connection state, staleness tracking, configuration, and the
//! supervised feed client itself.

pub mod client;
pub mod config;
pub mod connection_state;
pub mod staleness;

pub use client::{FeedClient, FeedHandle};
pub use config::FeedConfig;
pub use connection_state::{AtomicConnectionState, ConnectionState};
pub use staleness::StalenessTracker;
