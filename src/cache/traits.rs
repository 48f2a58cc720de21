//! Raw cache store trait

use super::errors::CacheResult;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// String-level operations a cache backend provides
///
/// Implemented by the Redis, in-memory and no-op providers. Values are opaque
/// strings here; typing and error absorption live in
/// [`crate::cache::CacheService`].
pub trait CacheStore: Send + Sync {
    /// `Ok(Some(value))` on hit, `Ok(None)` on miss or expired entry
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Store a value; `None` TTL means the entry never expires
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Remove a key; `Ok(true)` when it existed
    fn delete(&self, key: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Remove every key matching a glob pattern and return how many were removed.
    ///
    /// Enumeration and deletion are separate steps: a key written between them
    /// survives.
    fn delete_pattern(&self, pattern: &str) -> impl Future<Output = CacheResult<u64>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    fn hgetall(&self, key: &str)
        -> impl Future<Output = CacheResult<HashMap<String, String>>> + Send;

    /// Push values onto the head of a list, returning the new length
    fn lpush(&self, key: &str, values: &[String]) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Inclusive range with Redis index semantics (negative counts from the end)
    fn lrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> impl Future<Output = CacheResult<Vec<String>>> + Send;

    /// Add members to a set, returning how many were not already present
    fn sadd(&self, key: &str, members: &[String]) -> impl Future<Output = CacheResult<u64>> + Send;

    fn smembers(&self, key: &str) -> impl Future<Output = CacheResult<Vec<String>>> + Send;

    /// `Ok(true)` when the backend answers
    fn ping(&self) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Release backend resources
    fn close(&self) -> impl Future<Output = CacheResult<()>> + Send {
        async { Ok(()) }
    }

    fn provider_name(&self) -> &'static str;
}
