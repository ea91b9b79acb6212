use crate::traits::decoder::WsMessage;
use crate::traits::error::Result;
use async_trait::async_trait;

/// Trait for providing authentication to a feed session.
///
/// The auth message, if any, is sent immediately after the handshake and
/// before any subscription payloads.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Build the authentication message for a new session.
    ///
    /// # Returns
    /// * `Ok(Some(message))` - send this message after connecting
    /// * `Ok(None)` - no authentication needed
    /// * `Err(FeedError)` - credentials unavailable or signing failed
    async fn get_auth_message(&self) -> Result<Option<WsMessage>>;
}

/// No-op auth provider for public feeds
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn get_auth_message(&self) -> Result<Option<WsMessage>> {
        Ok(None)
    }
}
