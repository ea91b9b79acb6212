use crate::traits::error::Result;

/// Type alias for WebSocket messages
/// Can be Text or Binary data
#[derive(Debug, Clone)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }
}

/// Trait for decoding raw WebSocket frames into typed events.
///
/// One decoder instance serves the whole session. Decoding runs inline on
/// the read loop, so implementations should be cheap and must not block.
///
/// Error contract: a `Err(FeedError::Decode)` marks a single malformed
/// frame. The client logs it and skips the frame; it never tears down the
/// session for one bad frame.
pub trait FrameDecoder: Send + Sync + 'static {
    /// The typed event this decoder produces.
    type Event: Send + std::fmt::Debug + 'static;

    /// Decode a frame.
    ///
    /// # Returns
    /// * `Ok(Some(event))` - a typed event to deliver to the consumer
    /// * `Ok(None)` - a frame with no event value (control traffic)
    /// * `Err(FeedError::Decode)` - malformed frame, skipped
    fn decode(&self, frame: WsMessage) -> Result<Option<Self::Event>>;

    /// Whether this event acknowledges one of the session's subscriptions.
    ///
    /// Used by the client to complete `connect()` once all configured
    /// channels are live.
    fn is_subscription_ack(&self, event: &Self::Event) -> bool;
}
