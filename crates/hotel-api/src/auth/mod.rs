//! Authentication module
//!
//! - Access token signing and validation (HS512 JWT)
//! - Opaque refresh tokens bound to user, purpose and security stamp
//! - Argon2id password hashing and the password policy
//! - Credential stores (in-memory and PostgreSQL)
//! - The auth manager tying them together
//! - Bearer token middleware

pub mod jwt;
pub mod manager;
pub mod middleware;
pub mod models;
pub mod password;
pub mod pg_store;
pub mod refresh;
pub mod store;

pub use jwt::{Claims, JwtError, TokenService};
pub use manager::{hash_token, AuthError, AuthManager};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use models::{
    ApiUserDto, AuthResponse, IdentityError, LoginDto, User, UserClaim, ADMIN_ROLE, DEFAULT_ROLE,
};
pub use password::{PasswordConfig, PasswordHashing, PasswordPolicy};
pub use pg_store::PgCredentialStore;
pub use refresh::RefreshTokenProvider;
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError};
