//! PostgreSQL credential store
//!
//! Tables (see `migrations/`): users, roles, user_roles, user_claims,
//! user_tokens. Normalized upper-case columns back the case-insensitive
//! lookups and their unique indexes.

use super::models::{new_security_stamp, normalize, IdentityError, User, UserClaim};
use super::password::{PasswordConfig, PasswordHashing, PasswordPolicy};
use super::store::{validate_new_user, CredentialStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;

const UNIQUE_VIOLATION: &str = "23505";

const USER_COLUMNS: &str =
    "id, user_name, email, first_name, last_name, security_stamp, created_at";

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    user_name: String,
    email: String,
    first_name: String,
    last_name: String,
    security_stamp: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            user_name: row.user_name,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            security_stamp: row.security_stamp,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ClaimRow {
    claim_type: String,
    claim_value: String,
}

fn db_error(action: &str, err: sqlx::Error) -> StoreError {
    StoreError::Database(format!("Failed to {action}: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

/// Credential store backed by PostgreSQL
pub struct PgCredentialStore {
    pool: PgPool,
    passwords: PasswordHashing,
    policy: PasswordPolicy,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, password_config: PasswordConfig) -> Self {
        Self {
            pool,
            passwords: PasswordHashing::new(password_config),
            policy: PasswordPolicy::default(),
        }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find user", e))?;
        Ok(row.map(Into::into))
    }

    /// Insert the seeded roles if they are missing
    pub async fn ensure_roles(&self, roles: &[&str]) -> Result<(), StoreError> {
        for role in roles {
            sqlx::query(
                "INSERT INTO roles (name, normalized_name) VALUES ($1, $2) \
                 ON CONFLICT (normalized_name) DO NOTHING",
            )
            .bind(*role)
            .bind(normalize(role))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("seed roles", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("normalized_email", &normalize(email)).await
    }

    async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        self.find_one("normalized_user_name", &normalize(user_name))
            .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.find_one("id", id).await
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(&user.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("load password hash", e))?;

        let hash = hash.ok_or_else(|| StoreError::UserNotFound(user.id.clone()))?;
        Ok(self.passwords.verify(password, &hash).await?)
    }

    async fn check_unknown_user_password(&self, password: &str) -> Result<bool, StoreError> {
        Ok(self.passwords.verify_dummy(password).await?)
    }

    async fn create(&self, user: &User, password: &str) -> Result<Vec<IdentityError>, StoreError> {
        let mut errors = validate_new_user(user, password, &self.policy);

        if self.find_by_name(&user.user_name).await?.is_some() {
            errors.push(IdentityError::duplicate_user_name(&user.user_name));
        }
        if self.find_by_email(&user.email).await?.is_some() {
            errors.push(IdentityError::duplicate_email(&user.email));
        }
        if !errors.is_empty() {
            return Ok(errors);
        }

        let password_hash = self.passwords.hash(password).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, user_name, normalized_user_name, email, normalized_email,
                               first_name, last_name, password_hash, security_stamp, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.user_name)
        .bind(normalize(&user.user_name))
        .bind(&user.email)
        .bind(normalize(&user.email))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&password_hash)
        .bind(&user.security_stamp)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Vec::new()),
            // Lost a race with a concurrent registration of the same name.
            Err(e) if is_unique_violation(&e) => {
                Ok(vec![IdentityError::duplicate_user_name(&user.user_name)])
            }
            Err(e) => Err(db_error("create user", e)),
        }
    }

    async fn add_to_role(&self, user: &User, role: &str) -> Result<Vec<IdentityError>, StoreError> {
        let role_id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM roles WHERE normalized_name = $1")
                .bind(normalize(role))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find role", e))?;

        let Some(role_id) = role_id else {
            return Ok(vec![IdentityError::invalid_role_name(role)]);
        };

        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(&user.id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("assign role", e))?;

        if result.rows_affected() == 0 {
            return Ok(vec![IdentityError::user_already_in_role(role)]);
        }
        Ok(Vec::new())
    }

    async fn get_roles(&self, user: &User) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load roles", e))
    }

    async fn get_claims(&self, user: &User) -> Result<Vec<UserClaim>, StoreError> {
        let rows = sqlx::query_as::<_, ClaimRow>(
            "SELECT claim_type, claim_value FROM user_claims WHERE user_id = $1 ORDER BY id",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load claims", e))?;

        Ok(rows
            .into_iter()
            .map(|row| UserClaim::new(row.claim_type, row.claim_value))
            .collect())
    }

    async fn add_claim(&self, user: &User, claim: UserClaim) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO user_claims (user_id, claim_type, claim_value) VALUES ($1, $2, $3)")
            .bind(&user.id)
            .bind(&claim.claim_type)
            .bind(&claim.claim_value)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("add claim", e))?;
        Ok(())
    }

    async fn get_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar(
            "SELECT value FROM user_tokens WHERE user_id = $1 AND login_provider = $2 AND name = $3",
        )
        .bind(&user.id)
        .bind(login_provider)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("load token", e))
    }

    async fn set_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, login_provider, name, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, login_provider, name) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(&user.id)
        .bind(login_provider)
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("store token", e))?;
        Ok(())
    }

    async fn remove_auth_token(
        &self,
        user: &User,
        login_provider: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM user_tokens WHERE user_id = $1 AND login_provider = $2 AND name = $3",
        )
        .bind(&user.id)
        .bind(login_provider)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("remove token", e))?;
        Ok(())
    }

    async fn update_security_stamp(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET security_stamp = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new_security_stamp())
            .bind(&user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("rotate security stamp", e))?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::UserNotFound(user.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{DEFAULT_ROLE, SEEDED_ROLES};

    async fn test_store() -> Option<PgCredentialStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        let store = PgCredentialStore::new(pool, PasswordConfig::fast());
        store.ensure_roles(&SEEDED_ROLES).await.ok()?;
        Some(store)
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database in DATABASE_URL"]
    async fn test_pg_register_role_and_token_slot() {
        let Some(store) = test_store().await else {
            return;
        };
        let email = format!("{}@example.com", uuid::Uuid::new_v4());
        let user = User::new(&email, "Ada", "Lovelace");

        assert!(store.create(&user, "P@ssw0rd").await.unwrap().is_empty());
        assert!(!store.create(&user, "P@ssw0rd").await.unwrap().is_empty());
        assert!(store.add_to_role(&user, DEFAULT_ROLE).await.unwrap().is_empty());
        assert_eq!(store.get_roles(&user).await.unwrap(), vec![DEFAULT_ROLE]);

        store.set_auth_token(&user, "HotelApi", "RefreshToken", "a").await.unwrap();
        store.set_auth_token(&user, "HotelApi", "RefreshToken", "b").await.unwrap();
        assert_eq!(
            store.get_auth_token(&user, "HotelApi", "RefreshToken").await.unwrap(),
            Some("b".to_string())
        );

        let found = store.find_by_email(&email.to_uppercase()).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }
}
