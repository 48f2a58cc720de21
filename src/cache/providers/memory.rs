//! In-process cache provider
//!
//! DashMap-backed store with per-entry TTL and the same value kinds as Redis
//! (strings, hashes, lists, sets). Expiry is checked on access against
//! [`tokio::time::Instant`], so paused test clocks drive it.
//!
//! **Important**: state is per process. Invalidations in one process are not
//! seen by another.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheStore;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: StoredValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::BackendError(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

/// In-memory cache store
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Run `read` against a live entry; expired entries are removed and read as absent
    fn read<R>(&self, key: &str, read: impl FnOnce(&StoredValue) -> R) -> Option<R> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(read(&entry.value));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Run `write` against the entry for `key`, creating it with `empty` when
    /// absent or expired
    fn write<R>(
        &self,
        key: &str,
        empty: impl Fn() -> StoredValue,
        write: impl FnOnce(&mut StoredValue) -> CacheResult<R>,
    ) -> CacheResult<R> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(empty()));
        if entry.is_expired(now) {
            *entry = Entry::new(empty());
        }
        write(&mut entry.value)
    }
}

/// Resolve a Redis-style inclusive range against a list of `len` items
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Redis-style glob match supporting `*`, `?` and `\` escapes
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0usize, 0usize);
    // position of the last `*` and the key index it currently absorbs up to
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    backtrack = Some((p, k));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    k += 1;
                    continue;
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        p += 2;
                        k += 1;
                        continue;
                    }
                }
                literal => {
                    if literal == key[k] {
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star, absorbed)) => {
                p = star + 1;
                k = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            }
            None => return false,
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self
            .read(key, |value| match value {
                StoredValue::Text(text) => Ok(text.clone()),
                _ => Err(wrong_type(key)),
            })
            .transpose()?;

        if result.is_some() {
            debug!(key = key, "Cache HIT (memory)");
        } else {
            debug!(key = key, "Cache MISS (memory)");
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        // a TTL past the clock's range never expires
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.insert(
            key.to_string(),
            Entry {
                value: StoredValue::Text(value.to_string()),
                expires_at,
            },
        );
        debug!(key = key, ttl_seconds = ttl.map(|t| t.as_secs()), "Cache SET (memory)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let removed = self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now));
        debug!(key = key, removed = removed, "Cache DEL (memory)");
        Ok(removed)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let now = Instant::now();
        let matched: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now) && glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut deleted = 0u64;
        for key in matched {
            if self.entries.remove(&key).is_some() {
                deleted += 1;
            }
        }

        debug!(pattern = pattern, deleted = deleted, "Cache pattern DEL (memory)");
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.read(key, |_| ()).is_some())
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.read(key, |value| match value {
            StoredValue::Hash(hash) => Ok(hash.get(field).cloned()),
            _ => Err(wrong_type(key)),
        })
        .transpose()
        .map(Option::flatten)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> CacheResult<()> {
        self.write(
            key,
            || StoredValue::Hash(HashMap::new()),
            |stored| match stored {
                StoredValue::Hash(hash) => {
                    hash.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.read(key, |value| match value {
            StoredValue::Hash(hash) => Ok(hash.clone()),
            _ => Err(wrong_type(key)),
        })
        .unwrap_or_else(|| Ok(HashMap::new()))
    }

    async fn lpush(&self, key: &str, values: &[String]) -> CacheResult<u64> {
        self.write(
            key,
            || StoredValue::List(VecDeque::new()),
            |stored| match stored {
                StoredValue::List(list) => {
                    for value in values {
                        list.push_front(value.clone());
                    }
                    Ok(list.len() as u64)
                }
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> CacheResult<Vec<String>> {
        self.read(key, |value| match value {
            StoredValue::List(list) => Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            _ => Err(wrong_type(key)),
        })
        .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<u64> {
        self.write(
            key,
            || StoredValue::Set(BTreeSet::new()),
            |stored| match stored {
                StoredValue::Set(set) => Ok(members
                    .iter()
                    .filter(|member| set.insert((*member).clone()))
                    .count() as u64),
                _ => Err(wrong_type(key)),
            },
        )
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.read(key, |value| match value {
            StoredValue::Set(set) => Ok(set.iter().cloned().collect()),
            _ => Err(wrong_type(key)),
        })
        .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ping(&self) -> CacheResult<bool> {
        Ok(true)
    }

    async fn close(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
