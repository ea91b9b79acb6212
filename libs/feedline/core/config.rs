use crate::traits::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`FeedClient`](crate::FeedClient) session.
///
/// Holds the endpoint, the subscription payloads sent after each
/// (re)connection, optional authentication, the reconnection strategy, and
/// every timeout the client honors. None of the timeouts are infinite.
pub struct FeedConfig {
    /// WebSocket URL (wss:// or ws://)
    pub url: String,

    /// Subscription messages to send after connection/auth.
    /// `connect()` completes once one acknowledgment per payload arrived.
    pub subscriptions: Vec<WsMessage>,

    /// Optional authentication provider
    pub auth: Option<Arc<dyn AuthProvider>>,

    /// Bound on the WebSocket handshake
    pub handshake_timeout: Duration,

    /// Bound on waiting for subscription acknowledgments
    pub subscribe_ack_timeout: Duration,

    /// If no frame arrives within this window the session is force-closed
    pub staleness_window: Duration,

    /// Reconnection strategy
    pub reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// A session that stayed subscribed at least this long resets the
    /// reconnection attempt counter (distinguishes healthy sessions from
    /// flapping ones)
    pub stable_session_min: Duration,

    /// Shutdown flag - when false, the client closes the session and stops
    /// reconnecting
    pub shutdown_flag: Arc<AtomicBool>,
}

impl FeedConfig {
    /// Create a config with the given URL and defaults for everything else.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subscriptions: Vec::new(),
            auth: None,
            handshake_timeout: Duration::from_secs(10),
            subscribe_ack_timeout: Duration::from_secs(10),
            staleness_window: Duration::from_secs(30),
            reconnect_strategy: Box::new(ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(60),
                0.2,
                None,
            )),
            stable_session_min: Duration::from_secs(30),
            shutdown_flag: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_subscription(mut self, payload: WsMessage) -> Self {
        self.subscriptions.push(payload);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = window;
        self
    }

    pub fn with_reconnect_strategy(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = strategy;
        self
    }

    pub fn with_stable_session_min(mut self, min: Duration) -> Self {
        self.stable_session_min = min;
        self
    }

    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// Get the number of configured subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}
