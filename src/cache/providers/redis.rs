//! Redis cache provider
//!
//! Uses `redis::aio::ConnectionManager` for a multiplexed connection with
//! automatic reconnection. Every command is bounded by the configured command
//! timeout. Pattern deletes use SCAN, never KEYS.
//!
//! Requires the `cache-redis` feature flag.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheStore;
use crate::config::{redact_url, CacheConfig};
use redis::aio::ConnectionManager;
use redis::{FromRedisValue, RedisError};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed cache store
#[derive(Clone)]
pub struct RedisCacheStore {
    connection_manager: ConnectionManager,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("connection_manager", &"ConnectionManager")
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl RedisCacheStore {
    /// Connect using the discrete host/port/password/database fields
    pub async fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let url = config.redis_url();
        let client = redis::Client::open(url.as_str()).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager =
            tokio::time::timeout(config.connect_timeout(), ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    CacheError::Timeout(format!(
                        "Redis connect exceeded {}ms",
                        config.connect_timeout_ms
                    ))
                })?
                .map_err(|e| {
                    CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
                })?;

        info!(url = %redact_url(&url), "Redis cache store connected");

        Ok(Self {
            connection_manager,
            command_timeout: config.command_timeout(),
        })
    }

    /// Run one command with the command timeout applied
    async fn run<T, F, Fut>(&self, name: &str, command: F) -> CacheResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let connection = self.connection_manager.clone();
        match tokio::time::timeout(self.command_timeout, command(connection)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::BackendError(format!(
                "Redis {} failed: {}",
                name, e
            ))),
            Err(_) => Err(CacheError::Timeout(format!(
                "Redis {} exceeded {}ms",
                name,
                self.command_timeout.as_millis()
            ))),
        }
    }

    async fn query<T: FromRedisValue>(&self, name: &str, cmd: redis::Cmd) -> CacheResult<T> {
        self.run(name, |mut connection| async move {
            let value: T = cmd.query_async(&mut connection).await?;
            Ok(value)
        })
        .await
    }
}

/// `PX` argument for a TTL, saturating instead of truncating
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let result: Option<String> = self.query("GET", cmd).await?;

        if result.is_some() {
            debug!(key = key, "Cache HIT");
        } else {
            debug!(key = key, "Cache MISS");
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(px_millis(ttl));
        }
        let _: () = self.query("SET", cmd).await?;

        debug!(key = key, ttl_seconds = ttl.map(|t| t.as_secs()), "Cache SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: u64 = self.query("DEL", cmd).await?;

        debug!(key = key, removed = removed, "Cache DEL");
        Ok(removed > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut deleted: u64 = 0;
        let mut cursor: u64 = 0;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100);
            let (next_cursor, keys): (u64, Vec<String>) = self.query("SCAN", scan).await?;

            if !keys.is_empty() {
                let mut del = redis::cmd("DEL");
                del.arg(&keys);
                let count: u64 = self.query("DEL (batch)", del).await?;
                deleted += count;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = pattern, deleted = deleted, "Cache pattern DEL");
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: u64 = self.query("EXISTS", cmd).await?;
        Ok(count == 1)
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key).arg(field);
        self.query("HGET", cmd).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> CacheResult<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key).arg(field).arg(value);
        let _: u64 = self.query("HSET", cmd).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key);
        self.query("HGETALL", cmd).await
    }

    async fn lpush(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(key).arg(values);
        self.query("LPUSH", cmd).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        let mut cmd = redis::cmd("LRANGE");
        cmd.arg(key).arg(start).arg(stop);
        self.query("LRANGE", cmd).await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key).arg(members);
        self.query("SADD", cmd).await
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut cmd = redis::cmd("SMEMBERS");
        cmd.arg(key);
        self.query("SMEMBERS", cmd).await
    }

    async fn ping(&self) -> CacheResult<bool> {
        let pong: String = self.query("PING", redis::cmd("PING")).await?;
        Ok(pong == "PONG")
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_argument_saturates() {
        assert_eq!(px_millis(Duration::from_secs(300)), 300_000);
        assert_eq!(px_millis(Duration::from_micros(10)), 1);
        assert_eq!(px_millis(Duration::MAX), u64::MAX);
    }
}
