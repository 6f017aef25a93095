//! Authentication data models
//!
//! - User: account record as seen by the auth manager (never carries the hash)
//! - UserClaim: extra claim stored against a user and copied into tokens
//! - IdentityError: validation failure reported back to clients as data
//! - Request/response DTOs for the account endpoints

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Role every self-registered user receives
pub const DEFAULT_ROLE: &str = "User";

/// Role granted by operators
pub const ADMIN_ROLE: &str = "Administrator";

/// Roles seeded into every credential store
pub const SEEDED_ROLES: [&str; 2] = [ADMIN_ROLE, DEFAULT_ROLE];

/// Login provider of the stored refresh token slot
pub const LOGIN_PROVIDER: &str = "HotelApi";

/// Token name of the stored refresh token slot
pub const REFRESH_TOKEN_NAME: &str = "RefreshToken";

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier (UUID v4)
    pub id: String,
    /// Login name, always equal to the email address
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Rotated to invalidate every outstanding refresh token
    pub security_stamp: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A new, not yet persisted account whose user name is its email
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let email = email.into();
        Self {
            id: Uuid::new_v4().to_string(),
            user_name: email.clone(),
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            security_stamp: new_security_stamp(),
            created_at: Utc::now(),
        }
    }
}

/// Fresh random security stamp
pub fn new_security_stamp() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Case-insensitive lookup key for user names, emails and role names
pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Claim attached to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    pub claim_type: String,
    pub claim_value: String,
}

impl UserClaim {
    pub fn new(claim_type: impl Into<String>, claim_value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
        }
    }
}

/// Identity validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn duplicate_user_name(user_name: &str) -> Self {
        Self::new(
            "DuplicateUserName",
            format!("Username '{user_name}' is already taken."),
        )
    }

    pub fn duplicate_email(email: &str) -> Self {
        Self::new("DuplicateEmail", format!("Email '{email}' is already taken."))
    }

    pub fn invalid_email(email: &str) -> Self {
        Self::new("InvalidEmail", format!("Email '{email}' is invalid."))
    }

    pub fn password_too_short(length: usize) -> Self {
        Self::new(
            "PasswordTooShort",
            format!("Passwords must be at least {length} characters."),
        )
    }

    pub fn password_requires_digit() -> Self {
        Self::new(
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        )
    }

    pub fn password_requires_lower() -> Self {
        Self::new(
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase ('a'-'z').",
        )
    }

    pub fn password_requires_upper() -> Self {
        Self::new(
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase ('A'-'Z').",
        )
    }

    pub fn password_requires_non_alphanumeric() -> Self {
        Self::new(
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non alphanumeric character.",
        )
    }

    pub fn invalid_role_name(role: &str) -> Self {
        Self::new("InvalidRoleName", format!("Role name '{role}' is invalid."))
    }

    pub fn user_already_in_role(role: &str) -> Self {
        Self::new("UserAlreadyInRole", format!("User already in role '{role}'."))
    }
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiUserDto {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 15,
        message = "Your password is limited to 6 to 15 characters"
    ))]
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 15,
        message = "Your password is limited to 6 to 15 characters"
    ))]
    pub password: String,
}

impl From<&ApiUserDto> for LoginDto {
    fn from(dto: &ApiUserDto) -> Self {
        Self {
            email: dto.email.clone(),
            password: dto.password.clone(),
        }
    }
}

/// Issued credentials; also the body of a refresh request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_uses_email_as_user_name() {
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        assert_eq!(user.user_name, user.email);
        assert!(Uuid::parse_str(&user.id).is_ok());
        assert!(!user.security_stamp.is_empty());
    }

    #[test]
    fn test_security_stamps_differ() {
        assert_ne!(new_security_stamp(), new_security_stamp());
    }

    #[test]
    fn test_normalize_is_case_insensitive() {
        assert_eq!(normalize(" Guest@Example.com "), normalize("GUEST@example.COM"));
    }

    #[test]
    fn test_api_user_dto_validation() {
        let dto = ApiUserDto {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_auth_response_wire_format() {
        let response = AuthResponse {
            user_id: "u1".to_string(),
            token: "t".to_string(),
            refresh_token: "r".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["refreshToken"], "r");
    }
}
