use thiserror::Error;

/// Main error type for feedline
#[derive(Error, Debug)]
pub enum FeedError {
    /// WebSocket connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// No frame received within the staleness window
    #[error("Feed stale: no frame for {0:?}")]
    Stale(std::time::Duration),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Subscription was not acknowledged
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Frame decoding error (recoverable, the frame is skipped)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Event channel closed by the consumer
    #[error("Event channel closed")]
    ChannelClosed,

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Reconnection strategy exhausted
    #[error("Reconnection failed after {attempts} attempts: {reason}")]
    ReconnectionFailed { attempts: usize, reason: String },
}

/// Result type for feedline operations
pub type Result<T> = std::result::Result<T, FeedError>;
