//! Application state management

use crate::auth::models::SEEDED_ROLES;
use crate::auth::{AuthError, AuthManager, InMemoryCredentialStore, PasswordConfig, PgCredentialStore};
use hotel_core::postgres::connect;
use hotel_core::{
    AppConfig, Clock, CountriesRepository, HotelsRepository, InMemoryDatabase,
    PgCountriesRepository, PgHotelsRepository, SystemClock,
};
use sqlx::postgres::PgPool;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Registration, login and token refresh
    pub auth: AuthManager,
    pub countries: Arc<dyn CountriesRepository>,
    pub hotels: Arc<dyn HotelsRepository>,
    /// Set when running against PostgreSQL; used by the readiness probe
    pub pool: Option<PgPool>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        auth: AuthManager,
        countries: Arc<dyn CountriesRepository>,
        hotels: Arc<dyn HotelsRepository>,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            config,
            auth,
            countries,
            hotels,
            pool,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// State backed by in-memory stores seeded with the reference countries
    pub fn in_memory(config: AppConfig) -> Result<Self, AuthError> {
        Self::with_memory_stores(config, PasswordConfig::default())
    }

    fn with_memory_stores(
        config: AppConfig,
        password_config: PasswordConfig,
    ) -> Result<Self, AuthError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(InMemoryCredentialStore::new(password_config));
        let auth = AuthManager::from_settings(store, &config.jwt, clock)?;

        let db = InMemoryDatabase::seeded();
        Ok(Self::new(
            config,
            auth,
            Arc::new(db.countries()),
            Arc::new(db.hotels()),
            None,
        ))
    }

    /// State backed by PostgreSQL at `config.database.url`
    pub async fn postgres(config: AppConfig) -> anyhow::Result<Self> {
        let pool = connect(&config.database).await?;

        let store = PgCredentialStore::new(pool.clone(), PasswordConfig::default());
        store.ensure_roles(&SEEDED_ROLES).await?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let auth = AuthManager::from_settings(Arc::new(store), &config.jwt, clock)?;

        info!(
            max_connections = config.database.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self::new(
            config,
            auth,
            Arc::new(PgCountriesRepository::new(pool.clone())),
            Arc::new(PgHotelsRepository::new(pool.clone())),
            Some(pool),
        ))
    }

    /// In-memory state with cheap password hashing, for tests
    ///
    /// # Panics
    ///
    /// Panics if the default JWT settings cannot key the refresh token provider.
    pub fn for_testing() -> Self {
        Self::with_memory_stores(AppConfig::default(), PasswordConfig::fast())
            .expect("default settings build an auth manager")
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotel_core::GenericRepository;

    #[tokio::test]
    async fn test_in_memory_state_is_seeded() {
        let state = AppState::for_testing();
        let countries = state.countries.get_all().await.unwrap();
        assert_eq!(countries.len(), 3);
        assert!(state.pool.is_none());
    }

    #[test]
    fn test_request_counter() {
        let state = AppState::for_testing();
        assert_eq!(state.increment_requests(), 0);
        assert_eq!(state.increment_requests(), 1);
        assert_eq!(state.get_request_count(), 2);
    }

    #[test]
    fn test_ready_toggle() {
        let state = AppState::for_testing();
        assert!(state.is_ready());
        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
