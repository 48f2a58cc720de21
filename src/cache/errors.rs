//! Cache error types
//!
//! Internal to the cache layer: [`crate::cache::CacheService`] absorbs every
//! variant and degrades to a miss, `false` or `0`.

use thiserror::Error;

/// Errors raised by cache stores
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the cache backend
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// Value could not be serialized or deserialized
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// Backend did not answer within the command timeout
    #[error("Cache operation timed out: {0}")]
    Timeout(String),

    /// Backend rejected the command (including wrong-type access)
    #[error("Cache backend error: {0}")]
    BackendError(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
