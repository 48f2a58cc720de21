//! No-op cache provider
//!
//! Every read misses and every write succeeds. Selected when caching is
//! disabled or the configured backend cannot be reached at startup.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheStore;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCacheStore;

impl NoOpCacheStore {
    pub fn new() -> Self {
        Self
    }
}

impl CacheStore for NoOpCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn hget(&self, _key: &str, _field: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn hset(&self, _key: &str, _field: &str, _value: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn hgetall(&self, _key: &str) -> CacheResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }

    async fn lpush(&self, _key: &str, _values: &[String]) -> CacheResult<u64> {
        Ok(0)
    }

    async fn lrange(&self, _key: &str, _start: i64, _stop: i64) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn sadd(&self, _key: &str, _members: &[String]) -> CacheResult<u64> {
        Ok(0)
    }

    async fn smembers(&self, _key: &str) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_miss_and_writes_succeed() {
        let store = NoOpCacheStore::new();
        store
            .set("user:profile:u1", "{}", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(store.get("user:profile:u1").await.unwrap(), None);
        assert!(!store.exists("user:profile:u1").await.unwrap());
        assert_eq!(store.delete_pattern("user:*").await.unwrap(), 0);
        assert!(store.ping().await.unwrap());
        assert_eq!(store.provider_name(), "noop");
    }
}
