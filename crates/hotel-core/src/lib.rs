//! Hotel Core - Domain models, repositories, and shared types
//!
//! This crate defines the core abstractions used throughout the hotel listing API:
//! - Entity models (countries, hotels) and their optimistic concurrency token
//! - Common error types
//! - Paging and projection types
//! - The generic repository contract and its in-memory / PostgreSQL implementations
//! - Configuration management

pub mod clock;
pub mod config;
pub mod memory;
pub mod models;
pub mod paging;
pub mod postgres;
pub mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, ConfigError, DatabaseConfig, JwtSettings, LogFormat, LoggingConfig, ServerConfig,
};
pub use memory::{
    InMemoryCountriesRepository, InMemoryDatabase, InMemoryHotelsRepository, InMemoryRepository,
};
pub use models::{Country, CountryDetails, Entity, Hotel};
pub use paging::{PagedResult, QueryParameters, SortDirection, SortOrder};
pub use postgres::{PgCountriesRepository, PgEntity, PgHotelsRepository, PgRepository};
pub use repository::{CountriesRepository, GenericRepository, HotelsRepository};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for repository and domain operations
#[derive(Error, Debug)]
pub enum HotelError {
    #[error("{entity} ({key}) was not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} ({id}) was modified or deleted by another request")]
    Concurrency { entity: &'static str, id: i32 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HotelError {
    /// Shorthand for a not-found error keyed by an entity id
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        HotelError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HotelError::NotFound { .. })
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, HotelError::Concurrency { .. })
    }
}

impl From<ConfigError> for HotelError {
    fn from(err: ConfigError) -> Self {
        HotelError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HotelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = HotelError::not_found("Country", 42);
        assert_eq!(err.to_string(), "Country (42) was not found");
        assert!(err.is_not_found());
        assert!(!err.is_concurrency());
    }

    #[test]
    fn test_concurrency_message() {
        let err = HotelError::Concurrency {
            entity: "Hotel",
            id: 7,
        };
        assert!(err.is_concurrency());
        assert!(err.to_string().contains("Hotel (7)"));
    }
}
