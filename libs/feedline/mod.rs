//! # Feedline
//!
//! A resilient WebSocket market-feed client: connect, subscribe, detect
//! staleness, reconnect with backoff, and hand decoded events to a single
//! consumer over one typed channel.
//!
//! ## Features
//!
//! - **Atomic connection state**: lock-free state shared with supervisors
//! - **Staleness supervision**: the session is force-closed and reopened when
//!   no frame arrives within the configured window
//! - **Pluggable decoding**: venues implement [`FrameDecoder`] to turn raw
//!   frames into their own typed events
//! - **Jittered exponential backoff**: flapping sessions back off, stable
//!   sessions reset the attempt counter

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    client::{FeedClient, FeedHandle},
    config::FeedConfig,
    connection_state::{AtomicConnectionState, ConnectionState},
    staleness::StalenessTracker,
};

/// Type alias for Result with FeedError
pub type Result<T> = std::result::Result<T, traits::FeedError>;
