//! # Configuration
//!
//! Serde-backed configuration for the pooled, cached data-access layer.
//!
//! Durations are stored as integer `_ms` / `_seconds` fields so that TOML files
//! and `FITDATA__*` environment overrides stay readable; accessors convert them
//! to [`Duration`].
//!
//! ```rust,no_run
//! use fitness_data::config::ConfigLoader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! println!("pool max: {}", config.database.pool.max_connections);
//! # Ok(())
//! # }
//! ```

pub mod loader;

pub use loader::ConfigLoader;

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Root configuration for the data-access layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLayerConfig {
    /// Environment name (test, development, production)
    pub environment: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

/// Remote store connection parameters and pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Optional access key handed to the backend-client factory
    pub access_key: Option<String>,
    pub pool: PoolConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").unwrap_or_default(),
            access_key: None,
            pool: PoolConfig::default(),
        }
    }
}

/// Connection pool sizing and timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Advisory only: idle handles are never reaped
    pub idle_timeout_ms: u64,
    /// Reserved, `execute` never retries on its own
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 300_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl PoolConfig {
    /// Small pool with fast timeouts for rapid test feedback
    pub fn for_test() -> Self {
        Self {
            max_connections: 4,
            min_connections: 1,
            acquire_timeout_ms: 1_000,
            idle_timeout_ms: 10_000,
            retry_attempts: 0,
            retry_delay_ms: 100,
        }
    }

    pub fn for_development() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_ms: 5_000,
            ..Self::default()
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(DataError::configuration(
                "pool.max_connections must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DataError::configuration(format!(
                "pool.min_connections ({}) exceeds pool.max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquire_timeout_ms == 0 {
            return Err(DataError::configuration(
                "pool.acquire_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Cache backend connection parameters and TTL tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// "redis" | "dragonfly" | "memory" | "noop"
    pub backend: String,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: u32,
    /// Prepended to every key and pattern, e.g. `fitdata:`
    pub key_prefix: Option<String>,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "redis".to_string(),
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            database: 0,
            key_prefix: None,
            connect_timeout_ms: 10_000,
            command_timeout_ms: 5_000,
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl CacheConfig {
    /// In-process cache with production TTL tiers, no network dependency
    pub fn in_memory() -> Self {
        Self {
            backend: "memory".to_string(),
            ..Self::default()
        }
    }

    /// Build a `redis://` URL from the discrete connection fields
    pub fn redis_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// TTL tiers in seconds, ordered by data volatility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    pub short_seconds: u64,
    pub medium_seconds: u64,
    pub long_seconds: u64,
    pub very_long_seconds: u64,
    pub user_profile_seconds: u64,
    pub workout_plans_seconds: u64,
    pub nutrition_plans_seconds: u64,
    pub exercises_seconds: u64,
    pub meals_seconds: u64,
    pub progress_analytics_seconds: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            short_seconds: 300,
            medium_seconds: 1_800,
            long_seconds: 3_600,
            very_long_seconds: 86_400,
            user_profile_seconds: 1_800,
            workout_plans_seconds: 3_600,
            nutrition_plans_seconds: 3_600,
            exercises_seconds: 86_400,
            meals_seconds: 86_400,
            progress_analytics_seconds: 1_800,
        }
    }
}

impl CacheTtlConfig {
    /// Rapid invalidation for tests
    pub fn for_test() -> Self {
        Self {
            short_seconds: 1,
            medium_seconds: 2,
            long_seconds: 5,
            very_long_seconds: 10,
            user_profile_seconds: 2,
            workout_plans_seconds: 5,
            nutrition_plans_seconds: 5,
            exercises_seconds: 10,
            meals_seconds: 10,
            progress_analytics_seconds: 2,
        }
    }

    pub fn for_development() -> Self {
        Self {
            short_seconds: 30,
            medium_seconds: 120,
            long_seconds: 300,
            very_long_seconds: 600,
            user_profile_seconds: 120,
            workout_plans_seconds: 300,
            nutrition_plans_seconds: 300,
            exercises_seconds: 600,
            meals_seconds: 600,
            progress_analytics_seconds: 120,
        }
    }

    pub fn short(&self) -> Duration {
        Duration::from_secs(self.short_seconds)
    }

    pub fn medium(&self) -> Duration {
        Duration::from_secs(self.medium_seconds)
    }

    pub fn user_profile(&self) -> Duration {
        Duration::from_secs(self.user_profile_seconds)
    }

    pub fn workout_plans(&self) -> Duration {
        Duration::from_secs(self.workout_plans_seconds)
    }

    pub fn nutrition_plans(&self) -> Duration {
        Duration::from_secs(self.nutrition_plans_seconds)
    }

    pub fn exercises(&self) -> Duration {
        Duration::from_secs(self.exercises_seconds)
    }

    pub fn meals(&self) -> Duration {
        Duration::from_secs(self.meals_seconds)
    }

    pub fn progress_analytics(&self) -> Duration {
        Duration::from_secs(self.progress_analytics_seconds)
    }

    /// Warn about tiers that effectively disable caching
    pub fn validate(&self) {
        if self.user_profile_seconds == 0 {
            warn!("User profile cache TTL is 0 - profile caching effectively disabled");
        }
        if self.exercises_seconds < self.user_profile_seconds {
            warn!("Reference data TTL is shorter than profile TTL - reference data is the least volatile tier");
        }
    }
}

impl DataLayerConfig {
    /// Test preset: small pool, in-memory cache, rapid invalidation
    pub fn for_test(database_url: impl Into<String>) -> Self {
        Self {
            environment: "test".to_string(),
            database: DatabaseConfig {
                url: database_url.into(),
                access_key: None,
                pool: PoolConfig::for_test(),
            },
            cache: CacheConfig {
                ttl: CacheTtlConfig::for_test(),
                ..CacheConfig::in_memory()
            },
        }
    }

    pub fn for_development(database_url: impl Into<String>) -> Self {
        Self {
            environment: "development".to_string(),
            database: DatabaseConfig {
                url: database_url.into(),
                access_key: None,
                pool: PoolConfig::for_development(),
            },
            cache: CacheConfig {
                ttl: CacheTtlConfig::for_development(),
                ..CacheConfig::default()
            },
        }
    }

    /// Fail fast on parameters the layer cannot operate without
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(DataError::configuration(
                "database.url is required (set FITDATA__DATABASE__URL or DATABASE_URL)",
            ));
        }
        if let Some(key) = &self.database.access_key {
            if key.trim().is_empty() {
                return Err(DataError::configuration(
                    "database.access_key must not be empty when provided",
                ));
            }
        }
        self.database.pool.validate()?;
        self.cache.ttl.validate();
        Ok(())
    }

    /// Log current configuration with secrets redacted
    pub fn log_configuration(&self) {
        info!("Data Layer Configuration:");
        info!("  Environment: {}", self.environment);
        info!("  Database URL: {}", redact_url(&self.database.url));
        info!(
            "  Pool: {}..{} connections, {}ms acquire timeout",
            self.database.pool.min_connections,
            self.database.pool.max_connections,
            self.database.pool.acquire_timeout_ms
        );
        info!(
            "  Cache: {} (enabled: {}) at {}",
            self.cache.backend,
            self.cache.enabled,
            redact_url(&self.cache.redis_url())
        );
        info!(
            "  TTL tiers: profile {}s, plans {}s, reference {}s",
            self.cache.ttl.user_profile_seconds,
            self.cache.ttl.workout_plans_seconds,
            self.cache.ttl.exercises_seconds
        );
    }
}

/// Redact credentials from a connection URL for logging
pub fn redact_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // a colon before "//" is the scheme separator, not a password
            if url[..colon_pos].contains("//") {
                let prefix = &url[..=colon_pos];
                let suffix = &url[at_pos..];
                return format!("{prefix}***{suffix}");
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let pool = PoolConfig::default();
        assert_eq!(pool.max_connections, 10);
        assert_eq!(pool.min_connections, 2);
        assert_eq!(pool.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(pool.idle_timeout(), Duration::from_secs(300));
        assert_eq!(pool.retry_attempts, 3);

        let ttl = CacheTtlConfig::default();
        assert_eq!(ttl.exercises(), Duration::from_secs(86_400));
        assert_eq!(ttl.user_profile(), Duration::from_secs(1_800));
        assert!(ttl.exercises_seconds > ttl.user_profile_seconds);
    }

    #[test]
    fn missing_url_is_a_configuration_error() {
        let mut config = DataLayerConfig::for_test("postgresql://localhost/fitness_test");
        assert!(config.validate().is_ok());

        config.database.url = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(DataError::Configuration(_))
        ));
    }

    #[test]
    fn pool_bounds_are_validated() {
        let mut pool = PoolConfig::for_test();
        pool.min_connections = pool.max_connections + 1;
        assert!(pool.validate().is_err());

        pool.min_connections = 0;
        pool.max_connections = 0;
        assert!(pool.validate().is_err());
    }

    #[test]
    fn redis_url_includes_password_and_db() {
        let mut cache = CacheConfig::default();
        assert_eq!(cache.redis_url(), "redis://localhost:6379/0");

        cache.password = Some("secret".to_string());
        cache.database = 3;
        assert_eq!(cache.redis_url(), "redis://:secret@localhost:6379/3");
        assert_eq!(redact_url(&cache.redis_url()), "redis://:***@localhost:6379/3");
    }

    #[test]
    fn redact_url_masks_postgres_password() {
        assert_eq!(
            redact_url("postgresql://fit:hunter2@db:5432/fitness"),
            "postgresql://fit:***@db:5432/fitness"
        );
        assert_eq!(
            redact_url("postgresql://localhost/fitness"),
            "postgresql://localhost/fitness"
        );
    }
}
