//! # Data Layer Errors
//!
//! Errors that cross the facade boundary. Cache failures never appear here:
//! they are absorbed inside [`crate::cache::CacheService`] and degrade to a miss.

use std::time::Duration;
use thiserror::Error;

/// Structured error reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .code.as_ref().map(|c| format!(" (code {c})")).unwrap_or_default())]
pub struct BackendError {
    /// Store-specific error code (SQLSTATE for PostgreSQL), when available
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Required connection parameters are missing or invalid. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every handle stayed busy past the acquire deadline
    #[error("Database connection timeout after {}ms", .timeout.as_millis())]
    ConnectionTimeout { timeout: Duration },

    /// The pool was shut down with `close()`
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The remote store rejected or failed the operation
    #[error("Backend operation failed: {0}")]
    Backend(#[from] BackendError),

    /// Rows came back in a shape the entity record cannot represent
    #[error("Failed to decode {entity} row: {reason}")]
    Decode { entity: &'static str, reason: String },
}

impl DataError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn decode(entity: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Decode {
            entity,
            reason: error.to_string(),
        }
    }

    /// Pool exhaustion is the only condition a caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
