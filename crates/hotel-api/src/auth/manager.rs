//! Authentication manager
//!
//! Registration, login and refresh-token rotation over a `CredentialStore`.
//! Every operation receives the already resolved user explicitly; the manager
//! itself holds no per-request state.

use super::jwt::{JwtError, TokenService};
use super::models::{
    ApiUserDto, AuthResponse, IdentityError, LoginDto, User, DEFAULT_ROLE, LOGIN_PROVIDER,
    REFRESH_TOKEN_NAME,
};
use super::refresh::{RefreshTokenError, RefreshTokenProvider};
use super::store::{CredentialStore, StoreError};
use crate::audit::{audit_log, AuditEvent};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use hotel_core::{Clock, JwtSettings};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Unrecoverable authentication faults
///
/// Bad credentials and bad refresh tokens are not errors; they surface as
/// `None` from the corresponding operation.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Refresh token error: {0}")]
    RefreshToken(#[from] RefreshTokenError),

    #[error("Could not assign role '{role}' to new user: {reason}")]
    RoleAssignment { role: String, reason: String },

    #[error("Invalid token settings: {0}")]
    Settings(String),
}

/// Purpose string the refresh token provider binds tokens to
fn refresh_purpose() -> String {
    format!("{LOGIN_PROVIDER}:{REFRESH_TOKEN_NAME}")
}

/// SHA-256 digest of a refresh token, as stored in the token slot
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub struct AuthManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    refresh_tokens: RefreshTokenProvider,
}

impl AuthManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: TokenService,
        refresh_tokens: RefreshTokenProvider,
    ) -> Self {
        Self {
            store,
            tokens,
            refresh_tokens,
        }
    }

    /// Build the token service and refresh provider from settings
    pub fn from_settings(
        store: Arc<dyn CredentialStore>,
        settings: &JwtSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let hours = settings.refresh_token_lifetime_hours;
        let lifetime = i64::try_from(hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                AuthError::Settings(format!("refresh token lifetime of {hours} hours"))
            })?;
        let refresh_tokens = RefreshTokenProvider::new(&settings.key, lifetime, clock.clone())?;
        let tokens = TokenService::new(settings.clone(), clock);
        Ok(Self::new(store, tokens, refresh_tokens))
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Create an account and give it the default role
    ///
    /// Returns the identity errors that prevented creation; an empty list
    /// means the account now exists.
    pub async fn register(&self, dto: &ApiUserDto) -> Result<Vec<IdentityError>, AuthError> {
        let user = User::new(&dto.email, &dto.first_name, &dto.last_name);

        let errors = self.store.create(&user, &dto.password).await?;
        if !errors.is_empty() {
            debug!(email = %dto.email, errors = errors.len(), "Registration rejected");
            return Ok(errors);
        }

        let role_errors = self.store.add_to_role(&user, DEFAULT_ROLE).await?;
        if !role_errors.is_empty() {
            let reason = role_errors
                .iter()
                .map(|e| e.description.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AuthError::RoleAssignment {
                role: DEFAULT_ROLE.to_string(),
                reason,
            });
        }

        info!(user_id = %user.id, "User registered");
        Ok(Vec::new())
    }

    /// Verify credentials and issue an access token plus a rotated refresh token
    pub async fn login(&self, dto: &LoginDto) -> Result<Option<AuthResponse>, AuthError> {
        // Unknown email and wrong password must be indistinguishable, in
        // outcome and in hashing cost.
        let verified = match self.store.find_by_email(&dto.email).await? {
            Some(user) => self
                .store
                .check_password(&user, &dto.password)
                .await?
                .then_some(user),
            None => {
                self.store.check_unknown_user_password(&dto.password).await?;
                None
            }
        };
        let Some(user) = verified else {
            debug!("Login rejected: invalid credentials");
            return Ok(None);
        };

        let token = self.generate_token(&user).await?;
        let refresh_token = self.create_refresh_token(&user).await?;

        Ok(Some(AuthResponse {
            user_id: user.id,
            token,
            refresh_token,
        }))
    }

    /// Replace the user's stored refresh token and return the new raw token
    pub async fn create_refresh_token(&self, user: &User) -> Result<String, AuthError> {
        self.store
            .remove_auth_token(user, LOGIN_PROVIDER, REFRESH_TOKEN_NAME)
            .await?;

        let token = self.refresh_tokens.generate(user, &refresh_purpose())?;
        self.store
            .set_auth_token(user, LOGIN_PROVIDER, REFRESH_TOKEN_NAME, &hash_token(&token))
            .await?;

        Ok(token)
    }

    /// Exchange a (possibly expired) access token and its refresh token for new ones
    ///
    /// A refresh token that does not match rotates the user's security stamp,
    /// invalidating every outstanding refresh token for that user.
    pub async fn verify_refresh_token(
        &self,
        request: &AuthResponse,
    ) -> Result<Option<AuthResponse>, AuthError> {
        let claims = match self.tokens.read_claims_ignoring_expiry(&request.token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Refresh rejected: unreadable access token");
                return Ok(None);
            }
        };

        let user = match self.store.find_by_name(&claims.email).await? {
            Some(user) if user.id == request.user_id => user,
            _ => {
                debug!("Refresh rejected: token subject does not match user");
                return Ok(None);
            }
        };

        let stored = self
            .store
            .get_auth_token(&user, LOGIN_PROVIDER, REFRESH_TOKEN_NAME)
            .await?;
        let matches_slot = stored.as_deref() == Some(hash_token(&request.refresh_token).as_str());

        if matches_slot
            && self
                .refresh_tokens
                .validate(&user, &refresh_purpose(), &request.refresh_token)
        {
            let token = self.generate_token(&user).await?;
            let refresh_token = self.create_refresh_token(&user).await?;
            return Ok(Some(AuthResponse {
                user_id: user.id,
                token,
                refresh_token,
            }));
        }

        let rotated = self.store.update_security_stamp(&user).await?;
        warn!(user_id = %rotated.id, "Refresh token mismatch; security stamp rotated");
        audit_log(&AuditEvent::SecurityStampRotated {
            user_id: rotated.id,
            email: rotated.email,
            reason: "refresh token mismatch".to_string(),
        });

        Ok(None)
    }

    async fn generate_token(&self, user: &User) -> Result<String, AuthError> {
        let roles = self.store.get_roles(user).await?;
        let claims = self.store.get_claims(user).await?;
        Ok(self.tokens.generate_access_token(user, &roles, &claims)?)
    }
}
