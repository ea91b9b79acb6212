//! Kraken WebSocket authentication.
//!
//! Private-endpoint messages carry a token derived from the API secret:
//! base64(HMAC-SHA512(base64decode(secret), nonce + nonce)) with a
//! millisecond nonce.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing API credentials")]
    MissingCredentials,

    #[error("API secret is not valid base64: {0}")]
    InvalidSecret(#[from] base64::DecodeError),
}

/// API key pair for the private WebSocket.
#[derive(Clone)]
pub struct KrakenCredentials {
    api_key: String,
    api_secret: String,
}

impl KrakenCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load from `KRAKEN_API_KEY` / `KRAKEN_API_SECRET`.
    pub fn from_env() -> Result<Self, AuthError> {
        let api_key = std::env::var("KRAKEN_API_KEY").map_err(|_| AuthError::MissingCredentials)?;
        let api_secret =
            std::env::var("KRAKEN_API_SECRET").map_err(|_| AuthError::MissingCredentials)?;
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Authentication token for private messages.
    pub fn ws_token(&self) -> Result<String, AuthError> {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            .to_string();
        self.sign_nonce(&nonce)
    }

    fn sign_nonce(&self, nonce: &str) -> Result<String, AuthError> {
        let secret = BASE64_STANDARD.decode(&self.api_secret)?;
        let message = format!("{}{}", nonce, nonce);

        let mut mac =
            HmacSha512::new_from_slice(&secret).map_err(|_| AuthError::MissingCredentials)?;
        mac.update(message.as_bytes());
        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for KrakenCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never log the secret
        f.debug_struct("KrakenCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
