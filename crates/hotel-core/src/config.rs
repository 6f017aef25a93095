//! Hotel API Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest accepted access token lifetime (one week)
pub const MAX_ACCESS_TOKEN_MINUTES: u64 = 7 * 24 * 60;

/// Longest accepted refresh token lifetime (one year)
pub const MAX_REFRESH_TOKEN_HOURS: u64 = 365 * 24;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Bearer token settings
    pub jwt: JwtSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (environment-shaped)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(&lookup)?;
        Ok(config)
    }

    fn apply_lookup<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        // CORS origins from environment variable (comma-separated)
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // PostgreSQL
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // JWT
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.jwt.issuer = issuer;
        }
        if let Some(audience) = lookup("JWT_AUDIENCE") {
            self.jwt.audience = audience;
        }
        if let Some(key) = lookup("JWT_KEY") {
            self.jwt.key = key;
        }
        if let Some(minutes) = lookup("JWT_DURATION_MINUTES") {
            self.jwt.duration_in_minutes = parse_value("JWT_DURATION_MINUTES", minutes)?;
        }
        if let Some(hours) = lookup("JWT_REFRESH_LIFETIME_HOURS") {
            self.jwt.refresh_token_lifetime_hours =
                parse_value("JWT_REFRESH_LIFETIME_HOURS", hours)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_lookup(&|key: &str| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_KEY".to_string()));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_ISSUER".to_string()));
        }
        if self.jwt.audience.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_AUDIENCE".to_string()));
        }
        check_range(
            "JWT_DURATION_MINUTES",
            self.jwt.duration_in_minutes,
            MAX_ACCESS_TOKEN_MINUTES,
        )?;
        check_range(
            "JWT_REFRESH_LIFETIME_HOURS",
            self.jwt.refresh_token_lifetime_hours,
            MAX_REFRESH_TOKEN_HOURS,
        )?;
        Ok(())
    }
}

/// Lifetimes must be in `1..=max`
fn check_range(key: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; in-memory stores are used when absent
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Bearer token configuration
///
/// Mirrors the `JwtSettings` section consumed by the token service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    /// Token issuer (`iss`)
    pub issuer: String,

    /// Token audience (`aud`)
    pub audience: String,

    /// Symmetric signing secret
    pub key: String,

    /// Access token lifetime
    pub duration_in_minutes: u64,

    /// Refresh token lifetime
    pub refresh_token_lifetime_hours: u64,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            issuer: "HotelListingAPI".to_string(),
            audience: "HotelListingAPIClient".to_string(),
            key: "development-signing-key-change-in-production-0123456789".to_string(),
            duration_in_minutes: 10,
            refresh_token_lifetime_hours: 24,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "hotel_api=debug,hotel_core=debug,tower_http=debug,audit=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert_eq!(config.jwt.duration_in_minutes, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_PORT", "9090"),
            ("DATABASE_URL", "postgres://localhost/hotels"),
            ("JWT_ISSUER", "issuer"),
            ("JWT_AUDIENCE", "audience"),
            ("JWT_KEY", "k3y"),
            ("JWT_DURATION_MINUTES", "30"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/hotels")
        );
        assert_eq!(config.jwt.issuer, "issuer");
        assert_eq!(config.jwt.audience, "audience");
        assert_eq!(config.jwt.key, "k3y");
        assert_eq!(config.jwt.duration_in_minutes, 30);
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("API_PORT", "not-a-port")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_key_and_zero_duration() {
        let mut config = AppConfig::default();
        config.jwt.key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));

        let mut config = AppConfig::default();
        config.jwt.duration_in_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_bounds_token_lifetimes() {
        let mut config = AppConfig::default();
        config.jwt.refresh_token_lifetime_hours = 3_000_000_000_000;
        match config.validate() {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "JWT_REFRESH_LIFETIME_HOURS");
                assert_eq!(value, "3000000000000");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        config.jwt.refresh_token_lifetime_hours = MAX_REFRESH_TOKEN_HOURS;
        assert!(config.validate().is_ok());

        config.jwt.duration_in_minutes = MAX_ACCESS_TOKEN_MINUTES + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "JWT_DURATION_MINUTES"
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [jwt]
            issuer = "from-file"
            duration_in_minutes = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.jwt.issuer, "from-file");
        assert_eq!(config.jwt.duration_in_minutes, 5);
        assert_eq!(config.jwt.audience, JwtSettings::default().audience);
        assert_eq!(config.server.port, 8080);
    }
}
