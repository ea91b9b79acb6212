//! Atomic connection state shared between the feed client and supervisors.

use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state of a feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No session open
    Disconnected = 0,
    /// Handshake or subscription in progress
    Connecting = 1,
    /// Session live, subscriptions acknowledged
    Subscribed = 2,
    /// No frame within the staleness window; force-close pending
    Stale = 3,
    /// Deliberate teardown in progress
    Closing = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Subscribed,
            3 => ConnectionState::Stale,
            4 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribed => "subscribed",
            ConnectionState::Stale => "stale",
            ConnectionState::Closing => "closing",
        };
        write!(f, "{}", s)
    }
}

/// Lock-free connection state holder
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.get() == ConnectionState::Subscribed
    }

    #[inline]
    pub fn is_closing(&self) -> bool {
        self.get() == ConnectionState::Closing
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}
