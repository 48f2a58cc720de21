//! Typed, failure-tolerant cache service
//!
//! Wraps the [`CacheProvider`] with JSON (de)serialization, hit/miss
//! accounting and invalidation helpers. No method here returns an error: any
//! backend or serialization failure is logged, counted and turned into a miss,
//! `false`, `0` or an empty collection.

use super::errors::CacheError;
use super::keys::{EntityKind, InvalidationTarget};
use super::provider::CacheProvider;
use super::traits::CacheStore;
use crate::config::CacheConfig;
use crate::metrics;
use opentelemetry::KeyValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of cache activity since creation or the last reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub provider: String,
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// `hits / (hits + misses)`, absent before the first lookup
    pub hit_rate: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CacheService {
    store: CacheProvider,
    key_prefix: Option<String>,
    counters: Arc<CacheCounters>,
}

impl CacheService {
    pub fn new(store: CacheProvider) -> Self {
        Self {
            store,
            key_prefix: None,
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// Build the configured provider (degrading to no-op) and apply the key prefix
    pub async fn from_config(config: &CacheConfig) -> Self {
        let store = CacheProvider::from_config_graceful(config).await;
        let service = Self::new(store);
        match &config.key_prefix {
            Some(prefix) if !prefix.is_empty() => service.with_key_prefix(prefix.clone()),
            _ => service,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.key_prefix {
            Some(prefix) => Cow::Owned(format!("{prefix}{key}")),
            None => Cow::Borrowed(key),
        }
    }

    fn degraded(&self, operation: &'static str, key: &str, error: &CacheError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        metrics::cache::degraded_operations_total()
            .add(1, &[KeyValue::new("operation", operation)]);
        warn!(
            operation = operation,
            key = key,
            error = %error,
            "Cache operation failed, continuing without cache"
        );
    }

    fn record_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::cache::lookups_total().add(
            1,
            &[KeyValue::new("result", if hit { "hit" } else { "miss" })],
        );
    }

    /// Typed read; absent on miss, expiry, backend failure or undecodable payload
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.key(key);
        let value = match self.store.get(&full_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    self.degraded("get", &full_key, &CacheError::from(e));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.degraded("get", &full_key, &e);
                None
            }
        };

        self.record_lookup(value.is_some());
        value
    }

    /// Store `value` as JSON; `None` TTL never expires. False when the write failed.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let full_key = self.key(key);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.degraded("set", &full_key, &CacheError::from(e));
                return false;
            }
        };

        match self.store.set(&full_key, &payload, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.degraded("set", &full_key, &e);
                false
            }
        }
    }

    /// True when the delete was carried out, whether or not the key existed
    pub async fn delete(&self, key: &str) -> bool {
        let full_key = self.key(key);
        match self.store.delete(&full_key).await {
            Ok(_) => true,
            Err(e) => {
                self.degraded("delete", &full_key, &e);
                false
            }
        }
    }

    /// Delete every key matching `pattern`.
    ///
    /// Enumeration and deletion are not atomic: a write landing between them
    /// survives the delete and is served until its TTL elapses.
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let full_pattern = self.key(pattern);
        match self.store.delete_pattern(&full_pattern).await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.degraded("delete_pattern", &full_pattern, &e);
                0
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        let full_key = self.key(key);
        match self.store.exists(&full_key).await {
            Ok(exists) => exists,
            Err(e) => {
                self.degraded("exists", &full_key, &e);
                false
            }
        }
    }

    pub async fn hget<T: DeserializeOwned>(&self, key: &str, field: &str) -> Option<T> {
        let full_key = self.key(key);
        match self.store.hget(&full_key, field).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| self.degraded("hget", &full_key, &CacheError::from(e)))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                self.degraded("hget", &full_key, &e);
                None
            }
        }
    }

    pub async fn hset<T: Serialize + ?Sized>(&self, key: &str, field: &str, value: &T) -> bool {
        let full_key = self.key(key);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.degraded("hset", &full_key, &CacheError::from(e));
                return false;
            }
        };
        match self.store.hset(&full_key, field, &payload).await {
            Ok(()) => true,
            Err(e) => {
                self.degraded("hset", &full_key, &e);
                false
            }
        }
    }

    /// Every field of a hash; absent when the hash is empty or missing
    pub async fn hgetall<T: DeserializeOwned>(&self, key: &str) -> Option<HashMap<String, T>> {
        let full_key = self.key(key);
        let raw = match self.store.hgetall(&full_key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.degraded("hgetall", &full_key, &e);
                return None;
            }
        };

        let mut parsed = HashMap::with_capacity(raw.len());
        for (field, value) in raw {
            match serde_json::from_str(&value) {
                Ok(value) => {
                    parsed.insert(field, value);
                }
                Err(e) => {
                    self.degraded("hgetall", &full_key, &CacheError::from(e));
                    return None;
                }
            }
        }
        (!parsed.is_empty()).then_some(parsed)
    }

    /// Push values onto the head of a list; returns the new length, 0 on failure
    pub async fn lpush<T: Serialize>(&self, key: &str, values: &[T]) -> u64 {
        let full_key = self.key(key);
        let payloads: Result<Vec<String>, _> = values.iter().map(serde_json::to_string).collect();
        let payloads = match payloads {
            Ok(payloads) => payloads,
            Err(e) => {
                self.degraded("lpush", &full_key, &CacheError::from(e));
                return 0;
            }
        };
        match self.store.lpush(&full_key, &payloads).await {
            Ok(len) => len,
            Err(e) => {
                self.degraded("lpush", &full_key, &e);
                0
            }
        }
    }

    pub async fn lrange<T: DeserializeOwned>(&self, key: &str, start: i64, stop: i64) -> Vec<T> {
        let full_key = self.key(key);
        let raw = match self.store.lrange(&full_key, start, stop).await {
            Ok(raw) => raw,
            Err(e) => {
                self.degraded("lrange", &full_key, &e);
                return Vec::new();
            }
        };
        raw.iter()
            .map(|value| serde_json::from_str(value))
            .collect::<Result<Vec<T>, _>>()
            .unwrap_or_else(|e| {
                self.degraded("lrange", &full_key, &CacheError::from(e));
                Vec::new()
            })
    }

    /// Add plain string members; returns how many were new
    pub async fn sadd(&self, key: &str, members: &[String]) -> u64 {
        let full_key = self.key(key);
        match self.store.sadd(&full_key, members).await {
            Ok(added) => added,
            Err(e) => {
                self.degraded("sadd", &full_key, &e);
                0
            }
        }
    }

    pub async fn smembers(&self, key: &str) -> Vec<String> {
        let full_key = self.key(key);
        match self.store.smembers(&full_key).await {
            Ok(members) => members,
            Err(e) => {
                self.degraded("smembers", &full_key, &e);
                Vec::new()
            }
        }
    }

    /// Remove every cached view owned by `owner_id`; returns the number of
    /// keys removed
    pub async fn invalidate(&self, kind: EntityKind, owner_id: &str) -> u64 {
        let mut removed = 0u64;
        for target in kind.invalidation_targets(owner_id) {
            match target {
                InvalidationTarget::Key(key) => {
                    let full_key = self.key(&key);
                    match self.store.delete(&full_key).await {
                        Ok(true) => removed += 1,
                        Ok(false) => {}
                        Err(e) => self.degraded("invalidate", &full_key, &e),
                    }
                }
                InvalidationTarget::Pattern(pattern) => removed += self.delete_pattern(&pattern).await,
            }
        }

        debug!(
            entity = %kind,
            owner_id = owner_id,
            removed = removed,
            "Cache invalidated"
        );
        removed
    }

    pub async fn invalidate_user(&self, user_id: &str) -> u64 {
        self.invalidate(EntityKind::User, user_id).await
    }

    pub async fn invalidate_workout_plan(&self, plan_id: &str) -> u64 {
        self.invalidate(EntityKind::WorkoutPlan, plan_id).await
    }

    pub async fn invalidate_nutrition_plan(&self, plan_id: &str) -> u64 {
        self.invalidate(EntityKind::NutritionPlan, plan_id).await
    }

    /// Remove every key under this service's prefix (all keys when unprefixed)
    pub async fn clear_all(&self) -> u64 {
        self.delete_pattern("*").await
    }

    pub async fn ping(&self) -> bool {
        match self.store.ping().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, provider = self.provider_name(), "Cache ping failed");
                false
            }
        }
    }

    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            warn!(error = %e, provider = self.provider_name(), "Cache close failed");
        }
    }

    /// Fraction of typed `get` calls that hit; `None` before the first lookup
    pub fn hit_rate(&self) -> Option<f64> {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let lookups = hits + self.counters.misses.load(Ordering::Relaxed);
        (lookups > 0).then(|| hits as f64 / lookups as f64)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            provider: self.provider_name().to_string(),
            enabled: self.is_enabled(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.errors.store(0, Ordering::Relaxed);
    }
}
