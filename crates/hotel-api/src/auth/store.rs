//! Credential store contract and its in-memory implementation
//!
//! The store owns password hashes; callers only ever see `User` records.
//! Lookups by email, user name and role name are case-insensitive.

use super::models::{
    new_security_stamp, normalize, IdentityError, User, UserClaim, SEEDED_ROLES,
};
use super::password::{PasswordConfig, PasswordError, PasswordHashing, PasswordPolicy};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;
use validator::ValidateEmail;

/// Credential store faults; validation failures are returned as data instead
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// User, role, claim and named-token persistence
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError>;

    /// Spend one full verification for a login that matched no account
    ///
    /// Always `Ok(false)`.
    async fn check_unknown_user_password(&self, password: &str) -> Result<bool, StoreError>;

    /// Validate, hash and persist a new account
    async fn create(&self, user: &User, password: &str) -> Result<Vec<IdentityError>, StoreError>;

    async fn add_to_role(&self, user: &User, role: &str) -> Result<Vec<IdentityError>, StoreError>;

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError>;

    async fn get_claims(&self, user: &User) -> Result<Vec<UserClaim>, StoreError>;

    async fn add_claim(&self, user: &User, claim: UserClaim) -> Result<(), StoreError>;

    async fn get_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn set_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    async fn remove_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<(), StoreError>;

    /// Replace the user's security stamp and return the updated record
    async fn update_security_stamp(&self, user: &User) -> Result<User, StoreError>;
}

/// Checks shared by every store before uniqueness is considered
pub fn validate_new_user(user: &User, password: &str, policy: &PasswordPolicy) -> Vec<IdentityError> {
    let mut errors = Vec::new();
    if !user.email.validate_email() {
        errors.push(IdentityError::invalid_email(&user.email));
    }
    errors.extend(policy.check(password));
    errors
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
    roles: BTreeSet<String>,
    claims: Vec<UserClaim>,
    tokens: HashMap<(String, String), String>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, StoredUser>,
    /// normalized role name -> display name
    roles: HashMap<String, String>,
}

impl Inner {
    fn find_by(&self, predicate: impl Fn(&User) -> bool) -> Option<&StoredUser> {
        self.users.values().find(|stored| predicate(&stored.user))
    }

    fn get_mut(&mut self, user: &User) -> Result<&mut StoredUser, StoreError> {
        self.users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::UserNotFound(user.id.clone()))
    }

    fn get(&self, user: &User) -> Result<&StoredUser, StoreError> {
        self.users
            .get(&user.id)
            .ok_or_else(|| StoreError::UserNotFound(user.id.clone()))
    }
}

/// Credential store held in process memory
pub struct InMemoryCredentialStore {
    inner: RwLock<Inner>,
    passwords: PasswordHashing,
    policy: PasswordPolicy,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl InMemoryCredentialStore {
    /// Store with the seeded roles and the default password policy
    pub fn new(password_config: PasswordConfig) -> Self {
        let roles = SEEDED_ROLES
            .iter()
            .map(|role| (normalize(role), role.to_string()))
            .collect();

        Self {
            inner: RwLock::new(Inner {
                users: HashMap::new(),
                roles,
            }),
            passwords: PasswordHashing::new(password_config),
            policy: PasswordPolicy::default(),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let key = normalize(email);
        let inner = self.inner.read().await;
        Ok(inner.find_by(|u| normalize(&u.email) == key).map(|s| s.user.clone()))
    }

    async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let key = normalize(user_name);
        let inner = self.inner.read().await;
        Ok(inner
            .find_by(|u| normalize(&u.user_name) == key)
            .map(|s| s.user.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(id).map(|s| s.user.clone()))
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let hash = self.inner.read().await.get(user)?.password_hash.clone();
        Ok(self.passwords.verify(password, &hash).await?)
    }

    async fn check_unknown_user_password(&self, password: &str) -> Result<bool, StoreError> {
        Ok(self.passwords.verify_dummy(password).await?)
    }

    async fn create(&self, user: &User, password: &str) -> Result<Vec<IdentityError>, StoreError> {
        let mut errors = validate_new_user(user, password, &self.policy);

        {
            let inner = self.inner.read().await;
            let name = normalize(&user.user_name);
            let email = normalize(&user.email);
            if inner.find_by(|u| normalize(&u.user_name) == name).is_some() {
                errors.push(IdentityError::duplicate_user_name(&user.user_name));
            }
            if inner.find_by(|u| normalize(&u.email) == email).is_some() {
                errors.push(IdentityError::duplicate_email(&user.email));
            }
        }
        if !errors.is_empty() {
            return Ok(errors);
        }

        let password_hash = self.passwords.hash(password).await?;

        let mut inner = self.inner.write().await;
        // Re-check under the write lock; another registration may have won.
        let name = normalize(&user.user_name);
        if inner.find_by(|u| normalize(&u.user_name) == name).is_some() {
            return Ok(vec![IdentityError::duplicate_user_name(&user.user_name)]);
        }

        inner.users.insert(
            user.id.clone(),
            StoredUser {
                user: user.clone(),
                password_hash,
                roles: BTreeSet::new(),
                claims: Vec::new(),
                tokens: HashMap::new(),
            },
        );
        Ok(Vec::new())
    }

    async fn add_to_role(&self, user: &User, role: &str) -> Result<Vec<IdentityError>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(role_name) = inner.roles.get(&normalize(role)).cloned() else {
            return Ok(vec![IdentityError::invalid_role_name(role)]);
        };

        let stored = inner.get_mut(user)?;
        if !stored.roles.insert(role_name) {
            return Ok(vec![IdentityError::user_already_in_role(role)]);
        }
        Ok(Vec::new())
    }

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().await.get(user)?.roles.iter().cloned().collect())
    }

    async fn get_claims(&self, user: &User) -> Result<Vec<UserClaim>, StoreError> {
        Ok(self.inner.read().await.get(user)?.claims.clone())
    }

    async fn add_claim(&self, user: &User, claim: UserClaim) -> Result<(), StoreError> {
        self.inner.write().await.get_mut(user)?.claims.push(claim);
        Ok(())
    }

    async fn get_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().await;
        let key = (login_provider.to_string(), name.to_string());
        Ok(inner.get(user)?.tokens.get(&key).cloned())
    }

    async fn set_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = (login_provider.to_string(), name.to_string());
        inner.get_mut(user)?.tokens.insert(key, value.to_string());
        Ok(())
    }

    async fn remove_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = (login_provider.to_string(), name.to_string());
        inner.get_mut(user)?.tokens.remove(&key);
        Ok(())
    }

    async fn update_security_stamp(&self, user: &User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.get_mut(user)?;
        stored.user.security_stamp = new_security_stamp();
        Ok(stored.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{ADMIN_ROLE, DEFAULT_ROLE};

    fn store() -> InMemoryCredentialStore {
        InMemoryCredentialStore::new(PasswordConfig::fast())
    }

    #[tokio::test]
    async fn test_create_and_find_case_insensitive() {
        let store = store();
        let user = User::new("Guest@Example.com", "Ada", "Lovelace");

        assert!(store.create(&user, "P@ssw0rd").await.unwrap().is_empty());

        let found = store.find_by_email("guest@example.COM").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.find_by_name("GUEST@EXAMPLE.COM").await.unwrap().is_some());
        assert!(store.find_by_id(&user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = store();
        let first = User::new("guest@example.com", "Ada", "Lovelace");
        let second = User::new("GUEST@example.com", "Grace", "Hopper");

        store.create(&first, "P@ssw0rd").await.unwrap();
        let codes: Vec<_> = store
            .create(&second, "P@ssw0rd")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();

        assert_eq!(codes, vec!["DuplicateUserName", "DuplicateEmail"]);
        assert_eq!(
            store.find_by_email("guest@example.com").await.unwrap().unwrap().id,
            first.id
        );
    }

    #[tokio::test]
    async fn test_weak_password_and_bad_email_rejected() {
        let store = store();
        let user = User::new("not-an-email", "Ada", "Lovelace");

        let errors = store.create(&user, "password").await.unwrap();
        let codes: Vec<_> = errors.iter().map(|e| e.code.as_str()).collect();

        assert!(codes.contains(&"InvalidEmail"));
        assert!(codes.contains(&"PasswordRequiresDigit"));
        assert!(store.find_by_id(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_password() {
        let store = store();
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        store.create(&user, "P@ssw0rd").await.unwrap();

        assert!(store.check_password(&user, "P@ssw0rd").await.unwrap());
        assert!(!store.check_password(&user, "Wr0ng!pass").await.unwrap());
        assert!(!store.check_unknown_user_password("P@ssw0rd").await.unwrap());
    }

    #[tokio::test]
    async fn test_roles() {
        let store = store();
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        store.create(&user, "P@ssw0rd").await.unwrap();

        assert!(store.add_to_role(&user, "user").await.unwrap().is_empty());
        assert_eq!(
            store.add_to_role(&user, DEFAULT_ROLE).await.unwrap()[0].code,
            "UserAlreadyInRole"
        );
        assert_eq!(
            store.add_to_role(&user, "Pilot").await.unwrap()[0].code,
            "InvalidRoleName"
        );
        store.add_to_role(&user, ADMIN_ROLE).await.unwrap();

        assert_eq!(
            store.get_roles(&user).await.unwrap(),
            vec![ADMIN_ROLE.to_string(), DEFAULT_ROLE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_auth_token_slot() {
        let store = store();
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        store.create(&user, "P@ssw0rd").await.unwrap();

        store.set_auth_token(&user, "HotelApi", "RefreshToken", "a").await.unwrap();
        store.set_auth_token(&user, "HotelApi", "RefreshToken", "b").await.unwrap();
        assert_eq!(
            store.get_auth_token(&user, "HotelApi", "RefreshToken").await.unwrap(),
            Some("b".to_string())
        );

        store.remove_auth_token(&user, "HotelApi", "RefreshToken").await.unwrap();
        assert!(store
            .get_auth_token(&user, "HotelApi", "RefreshToken")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_security_stamp() {
        let store = store();
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        store.create(&user, "P@ssw0rd").await.unwrap();

        let updated = store.update_security_stamp(&user).await.unwrap();
        assert_ne!(updated.security_stamp, user.security_stamp);
        assert_eq!(
            store.find_by_id(&user.id).await.unwrap().unwrap().security_stamp,
            updated.security_stamp
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_an_error() {
        let store = store();
        let ghost = User::new("ghost@example.com", "No", "One");
        assert!(matches!(
            store.get_roles(&ghost).await,
            Err(StoreError::UserNotFound(_))
        ));
    }
}
