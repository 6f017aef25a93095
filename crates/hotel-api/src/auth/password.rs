/// Password hashing, verification and policy
///
/// Hashes are Argon2id PHC strings, so parameters and salt travel with the
/// hash and verification needs no configuration.
use super::models::IdentityError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Minimal cost for test suites and throwaway dev stores
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password with the given Argon2id parameters
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        config.to_params()?,
    );

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash
///
/// `Ok(false)` means the password is wrong; `Err` means the hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Plaintext hashed once to back verifications for unknown accounts
const DUMMY_PASSWORD: &str = "hotel-api:no-such-account";

/// Argon2id hashing off the async runtime
///
/// Logins for unknown accounts verify against a dummy hash built with the
/// same parameters, so they cost as much as a wrong password.
#[derive(Debug, Clone)]
pub struct PasswordHashing {
    config: Arc<PasswordConfig>,
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHashing {
    pub fn new(config: PasswordConfig) -> Self {
        Self {
            config: Arc::new(config),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_string();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
    }

    /// Run a full verification that can never succeed
    pub async fn verify_dummy(&self, password: &str) -> Result<bool, PasswordError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await?;
        self.verify(password, hash).await?;
        Ok(false)
    }
}

/// Password rules applied when an account is created
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

impl PasswordPolicy {
    /// Every rule the password breaks; empty when it is acceptable
    pub fn check(&self, password: &str) -> Vec<IdentityError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(IdentityError::password_too_short(self.required_length));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(IdentityError::password_requires_non_alphanumeric());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::password_requires_digit());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(IdentityError::password_requires_lower());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(IdentityError::password_requires_upper());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("P@ssw0rd", &PasswordConfig::fast()).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("P@ssw0rd", &hash).unwrap());
        assert!(!verify_password("p@ssw0rd", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_hashes() {
        let config = PasswordConfig::fast();
        let a = hash_password("P@ssw0rd", &config).unwrap();
        let b = hash_password("P@ssw0rd", &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("P@ssw0rd", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[tokio::test]
    async fn test_hashing_runs_off_the_runtime() {
        let hashing = PasswordHashing::new(PasswordConfig::fast());
        let hash = hashing.hash("P@ssw0rd").await.unwrap();

        assert!(hashing.verify("P@ssw0rd", &hash).await.unwrap());
        assert!(!hashing.verify("Wr0ng!pass", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_dummy_verify_never_matches() {
        let hashing = PasswordHashing::new(PasswordConfig::fast());

        assert!(!hashing.verify_dummy(DUMMY_PASSWORD).await.unwrap());
        assert!(!hashing.verify_dummy("P@ssw0rd").await.unwrap());

        // Built once, with the configured cost parameters.
        let dummy = hashing.dummy_hash.get().unwrap();
        assert!(dummy.contains("m=1024,t=1,p=1"));
    }

    #[test]
    fn test_policy_accepts_strong_password() {
        assert!(PasswordPolicy::default().check("P@ssw0rd").is_empty());
    }

    #[test]
    fn test_policy_reports_every_failure() {
        let codes: Vec<_> = PasswordPolicy::default()
            .check("abc")
            .into_iter()
            .map(|e| e.code)
            .collect();

        assert_eq!(
            codes,
            vec![
                "PasswordTooShort",
                "PasswordRequiresNonAlphanumeric",
                "PasswordRequiresDigit",
                "PasswordRequiresUpper",
            ]
        );
    }
}
