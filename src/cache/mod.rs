//! # Cache Layer
//!
//! Typed key/value cache with per-entry TTL, a structured key namespace and
//! pattern-based bulk invalidation.
//!
//! ## Architecture
//!
//! ```text
//! CacheService                     <- typed JSON values, hit/miss stats, never errors
//!   └── CacheProvider (enum)       <- chosen from CacheConfig, degrades to NoOp
//!         ├── Redis(RedisCacheStore)    <- ConnectionManager, SCAN-based pattern delete
//!         ├── Memory(MemoryCacheStore)  <- DashMap with per-entry expiry
//!         └── NoOp(NoOpCacheStore)      <- always miss, always succeed
//! ```
//!
//! A cache outage costs latency, never availability: startup falls back to the
//! no-op store and runtime failures read as misses.
//!
//! ## Usage
//!
//! ```rust
//! use fitness_data::cache::{CacheKeys, CacheProvider, CacheService};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = CacheService::new(CacheProvider::memory());
//! let key = CacheKeys::exercises(Some("strength"));
//! cache.set(&key, &vec!["squat", "deadlift"], Some(Duration::from_secs(60))).await;
//! let cached: Option<Vec<String>> = cache.get(&key).await;
//! assert_eq!(cached.map(|v| v.len()), Some(2));
//! # }
//! ```

pub mod errors;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod service;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use keys::{CacheKeys, EntityKind, InvalidationTarget};
pub use provider::CacheProvider;
pub use providers::{MemoryCacheStore, NoOpCacheStore};
pub use service::{CacheService, CacheStats};
pub use traits::CacheStore;

#[cfg(feature = "cache-redis")]
pub use providers::RedisCacheStore;
