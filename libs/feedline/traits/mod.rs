//! Core traits and types for the feedline client.
//!
//! - **FrameDecoder**: turn raw WebSocket frames into typed events
//! - **AuthProvider**: produce the authentication message for a session
//! - **ReconnectionStrategy**: control reconnection behavior

pub mod auth;
pub mod decoder;
pub mod error;
pub mod reconnect;

pub use auth::{AuthProvider, NoAuth};
pub use decoder::{FrameDecoder, WsMessage};
pub use error::{FeedError, Result};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
