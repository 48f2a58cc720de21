//! Backend-client seams: the handle a pool hands out and the factory that makes it.

use crate::config::DatabaseConfig;
use crate::database::query::{Query, Row};
use crate::error::{BackendError, DataError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A live session against the remote store
///
/// Handles are owned by [`crate::database::ConnectionPool`] and lent to one
/// caller at a time.
#[async_trait]
pub trait BackendConnection: Send + Sync + fmt::Debug {
    /// Execute a query and return its rows
    async fn execute(&self, query: &Query) -> std::result::Result<Vec<Row>, BackendError>;

    /// Lightweight liveness probe
    async fn probe(&self) -> std::result::Result<(), BackendError> {
        self.execute(&Query::probe()).await.map(|_| ())
    }
}

/// Produces backend handles from connection parameters
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> std::result::Result<Arc<dyn BackendConnection>, BackendError>;

    fn name(&self) -> &'static str;
}

/// Parameters every handle is created with
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub url: String,
    pub access_key: Option<String>,
}

impl ConnectionParams {
    /// Requires a non-empty URL; fails fast otherwise
    pub fn new(url: impl Into<String>, access_key: Option<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DataError::configuration("backend URL is required"));
        }
        Ok(Self { url, access_key })
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.access_key.clone())
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("url", &crate::config::redact_url(&self.url))
            .field("access_key", &self.access_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            ConnectionParams::new("", None),
            Err(DataError::Configuration(_))
        ));
        assert!(ConnectionParams::new("postgresql://localhost/fitness", None).is_ok());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let params =
            ConnectionParams::new("postgresql://fit:pw@localhost/fitness", Some("anon-key".into()))
                .unwrap();
        let debug = format!("{params:?}");
        assert!(!debug.contains("pw@"));
        assert!(!debug.contains("anon-key"));
    }
}
