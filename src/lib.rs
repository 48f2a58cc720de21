#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Fitness Data Core
//!
//! Pooled, cached data-access layer for the fitness client backend.
//!
//! ## Overview
//!
//! Request handlers read and write user profiles, workout and nutrition plans,
//! sessions, logs and progress analytics through one facade. Reads go through
//! a key/value cache first; misses and every write run against the backend
//! store through a bounded pool of client handles.
//!
//! ## Module Organization
//!
//! - [`database`] - Connection pool, structured queries and the PostgreSQL client
//! - [`cache`] - Cache providers, key namespace and the typed cache service
//! - [`services`] - The data-access facade
//! - [`monitoring`] - Latency/error counters, health and recommendations
//! - [`models`] - Entity records and request types
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//! - [`metrics`] - OpenTelemetry instruments
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fitness_data::config::ConfigLoader;
//! use fitness_data::database::PgConnectionFactory;
//! use fitness_data::monitoring::DatabaseMonitor;
//! use fitness_data::services::DataAccessService;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! let data = DataAccessService::from_config(&config, Arc::new(PgConnectionFactory)).await?;
//!
//! let monitor = DatabaseMonitor::for_service(&data);
//! let user_id = uuid::Uuid::new_v4();
//! let profile = monitor
//!     .track_query("get_user_profile", || data.get_user_profile(user_id))
//!     .await?;
//! println!("{profile:?}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod monitoring;
pub mod services;

pub use cache::{CacheKeys, CacheProvider, CacheService, CacheStats, EntityKind};
pub use config::{CacheConfig, CacheTtlConfig, ConfigLoader, DataLayerConfig, DatabaseConfig, PoolConfig};
pub use database::{
    BackendConnection, ConnectionFactory, ConnectionParams, ConnectionPool, PoolStats,
    PooledConnection, Query,
};
pub use error::{BackendError, DataError, Result};
pub use monitoring::{DatabaseMonitor, HealthReport, MetricsSnapshot, PerformanceReport};
pub use services::{DataAccessService, DataAccessStats};
