//! Cache provider selected from configuration
//!
//! Enum dispatch over the concrete stores. Construction never fails: an
//! unreachable or unknown backend degrades to the no-op store and startup
//! continues.

use super::errors::CacheResult;
use super::providers::{MemoryCacheStore, NoOpCacheStore};
use super::traits::CacheStore;
use crate::config::CacheConfig;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisCacheStore;

#[derive(Debug, Clone)]
enum CacheBackend {
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCacheStore>),
    Memory(MemoryCacheStore),
    NoOp(NoOpCacheStore),
}

macro_rules! dispatch {
    ($backend:expr, $store:ident => $call:expr) => {
        match $backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis($store) => $call,
            CacheBackend::Memory($store) => $call,
            CacheBackend::NoOp($store) => $call,
        }
    };
}

/// The process-wide cache store
#[derive(Debug, Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
}

impl CacheProvider {
    /// Build the configured backend, falling back to no-op on any failure
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        if !config.enabled {
            info!("Cache disabled by configuration");
            return Self::noop();
        }

        match config.backend.as_str() {
            "redis" | "dragonfly" => Self::create_redis(config).await,
            "memory" | "in-memory" => {
                info!(backend = "memory", "In-process cache provider initialized");
                Self::memory()
            }
            "noop" | "none" => Self::noop(),
            other => {
                warn!(backend = other, "Unknown cache backend, falling back to NoOp");
                Self::noop()
            }
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis(config: &CacheConfig) -> Self {
        match RedisCacheStore::from_config(config).await {
            Ok(store) => {
                info!(backend = "redis", "Cache provider initialized successfully");
                Self {
                    backend: CacheBackend::Redis(Box::new(store)),
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp cache (graceful degradation)"
                );
                Self::noop()
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis(_config: &CacheConfig) -> Self {
        warn!("Redis cache backend requested but 'cache-redis' feature not enabled, using NoOp");
        Self::noop()
    }

    pub fn memory() -> Self {
        Self::from_memory(MemoryCacheStore::new())
    }

    /// Wrap an existing in-memory store (shared with the caller)
    pub fn from_memory(store: MemoryCacheStore) -> Self {
        Self {
            backend: CacheBackend::Memory(store),
        }
    }

    #[cfg(feature = "cache-redis")]
    pub fn from_redis(store: RedisCacheStore) -> Self {
        Self {
            backend: CacheBackend::Redis(Box::new(store)),
        }
    }

    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheStore::new()),
        }
    }

    /// False for the no-op store
    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, CacheBackend::NoOp(_))
    }
}

impl CacheStore for CacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        dispatch!(&self.backend, s => s.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        dispatch!(&self.backend, s => s.set(key, value, ttl).await)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        dispatch!(&self.backend, s => s.delete(key).await)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        dispatch!(&self.backend, s => s.delete_pattern(pattern).await)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        dispatch!(&self.backend, s => s.exists(key).await)
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        dispatch!(&self.backend, s => s.hget(key, field).await)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> CacheResult<()> {
        dispatch!(&self.backend, s => s.hset(key, field, value).await)
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        dispatch!(&self.backend, s => s.hgetall(key).await)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        dispatch!(&self.backend, s => s.lpush(key, values).await)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        dispatch!(&self.backend, s => s.lrange(key, start, stop).await)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        dispatch!(&self.backend, s => s.sadd(key, members).await)
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        dispatch!(&self.backend, s => s.smembers(key).await)
    }

    async fn ping(&self) -> CacheResult<bool> {
        dispatch!(&self.backend, s => s.ping().await)
    }

    async fn close(&self) -> CacheResult<()> {
        dispatch!(&self.backend, s => s.close().await)
    }

    fn provider_name(&self) -> &'static str {
        dispatch!(&self.backend, s => s.provider_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_config_yields_noop() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert_eq!(provider.provider_name(), "noop");
        assert!(!provider.is_enabled());
    }

    #[tokio::test]
    async fn memory_backend_is_selected_by_name() {
        let provider = CacheProvider::from_config_graceful(&CacheConfig::in_memory()).await;
        assert_eq!(provider.provider_name(), "memory");
        assert!(provider.is_enabled());

        provider.set("k", "v", None).await.unwrap();
        assert_eq!(provider.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn unknown_backend_degrades_to_noop() {
        let config = CacheConfig {
            backend: "memcached".to_string(),
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert_eq!(provider.provider_name(), "noop");
    }

    #[cfg(feature = "cache-redis")]
    #[tokio::test]
    async fn unreachable_redis_degrades_to_noop() {
        let config = CacheConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: 200,
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert_eq!(provider.provider_name(), "noop");
    }
}
