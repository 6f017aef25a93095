//! JWT access token generation and validation
//!
//! Access tokens are HS512-signed and carry the user's identity, roles and
//! stored claims. Issuer, audience, key and lifetime come from `JwtSettings`;
//! time comes from the injected `Clock`.

use super::models::{User, UserClaim};
use hotel_core::{Clock, JwtSettings};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Claim names owned by the token service; stored user claims cannot shadow them
const RESERVED_CLAIMS: &[&str] = &[
    "sub", "jti", "email", "uid", "roles", "iss", "aud", "iat", "exp", "nbf",
];

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's email
    pub sub: String,
    /// JWT ID - unique per issued token
    pub jti: String,
    pub email: String,
    /// User id
    pub uid: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub aud: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
    /// Stored user claims
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// Stateless signer and verifier of access tokens
#[derive(Clone)]
pub struct TokenService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(settings: JwtSettings, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.key.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.key.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
            clock,
        }
    }

    /// Issue a signed access token for an already resolved user
    pub fn generate_access_token(
        &self,
        user: &User,
        roles: &[String],
        user_claims: &[UserClaim],
    ) -> Result<String, JwtError> {
        let now = self.clock.now().timestamp();
        let lifetime = i64::try_from(self.settings.duration_in_minutes)
            .unwrap_or(i64::MAX / 60)
            .saturating_mul(60);

        let claims = Claims {
            sub: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            uid: user.id.clone(),
            roles: roles.to_vec(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now,
            exp: now.saturating_add(lifetime),
            extra: collect_extra_claims(user_claims),
        };

        let token = encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate signature, issuer, audience and lifetime with zero skew
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.decode_claims(token)?;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(JwtError::ExpiredToken);
        }
        Ok(claims)
    }

    /// Validate signature, issuer and audience; an expired token is still read
    pub fn read_claims_ignoring_expiry(&self, token: &str) -> Result<Claims, JwtError> {
        self.decode_claims(token)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, JwtError> {
        // Expiry is checked against the injected clock by the caller.
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }
}

fn collect_extra_claims(user_claims: &[UserClaim]) -> BTreeMap<String, Value> {
    let mut extra: BTreeMap<String, Value> = BTreeMap::new();

    for claim in user_claims {
        if RESERVED_CLAIMS.contains(&claim.claim_type.as_str()) {
            continue;
        }
        let value = Value::String(claim.claim_value.clone());
        match extra.get_mut(&claim.claim_type) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                extra.insert(claim.claim_type.clone(), value);
            }
        }
    }

    extra
}
