//! Opaque refresh tokens bound to a user, a purpose and a security stamp
//!
//! Format: `base64url(payload_json) "." base64url(HMAC-SHA256(payload_json))`.
//! Rotating the user's security stamp invalidates every token issued before.

use super::models::User;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use hmac::{Hmac, Mac};
use hotel_core::Clock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Label mixed into the signing key so refresh MACs never share a key with JWTs
const KEY_DERIVATION_LABEL: &[u8] = b"hotel-api:refresh-token-provider:v1";

#[derive(Debug, Error)]
pub enum RefreshTokenError {
    #[error("Invalid refresh token key: {0}")]
    InvalidKey(String),

    #[error("Failed to serialize refresh token: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    uid: String,
    purpose: String,
    stamp: String,
    iat: i64,
    nonce: String,
}

/// Generates and validates refresh tokens
#[derive(Clone)]
pub struct RefreshTokenProvider {
    key: Vec<u8>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenProvider {
    /// Derive the MAC key from the configured signing key
    pub fn new(
        signing_key: &str,
        lifetime: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RefreshTokenError> {
        let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
            .map_err(|e| RefreshTokenError::InvalidKey(e.to_string()))?;
        mac.update(KEY_DERIVATION_LABEL);
        let key = mac.finalize().into_bytes().to_vec();

        Ok(Self {
            key,
            lifetime,
            clock,
        })
    }

    fn sign(&self, data: &[u8]) -> Result<HmacSha256, RefreshTokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| RefreshTokenError::InvalidKey(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }

    pub fn generate(&self, user: &User, purpose: &str) -> Result<String, RefreshTokenError> {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let payload = Payload {
            uid: user.id.clone(),
            purpose: purpose.to_string(),
            stamp: user.security_stamp.clone(),
            iat: self.clock.now().timestamp(),
            nonce: URL_SAFE_NO_PAD.encode(nonce),
        };
        let payload = serde_json::to_vec(&payload)?;
        let tag = self.sign(&payload)?.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// True iff the MAC verifies and the token matches user, purpose,
    /// current security stamp and lifetime
    pub fn validate(&self, user: &User, purpose: &str, token: &str) -> bool {
        let Some((payload, tag)) = token.split_once('.') else {
            return false;
        };
        let (Ok(payload), Ok(tag)) = (URL_SAFE_NO_PAD.decode(payload), URL_SAFE_NO_PAD.decode(tag))
        else {
            return false;
        };

        let Ok(mac) = self.sign(&payload) else {
            return false;
        };
        if mac.verify_slice(&tag).is_err() {
            return false;
        }

        let Ok(payload) = serde_json::from_slice::<Payload>(&payload) else {
            return false;
        };

        let now = self.clock.now().timestamp();
        let expires_at = payload.iat.saturating_add(self.lifetime.num_seconds());

        payload.uid == user.id
            && payload.purpose == purpose
            && payload.stamp == user.security_stamp
            && payload.iat <= now
            && now < expires_at
    }
}
