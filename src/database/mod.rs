//! # Database Access
//!
//! Connection pooling over a pluggable backend client.
//!
//! ## Key Components
//!
//! - [`query`] - Store-agnostic query model (filtered select, insert, update, stored-function call)
//! - [`connection`] - The [`BackendConnection`] / [`ConnectionFactory`] seams
//! - [`pool`] - Bounded [`ConnectionPool`] with lazy growth and timed, blocking acquire
//! - [`postgres`] - PostgreSQL backend built on SQLx
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fitness_data::config::PoolConfig;
//! use fitness_data::database::{ConnectionParams, ConnectionPool, PgConnectionFactory, Query};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams::new("postgresql://localhost/fitness", None)?;
//! let pool = ConnectionPool::connect(
//!     PoolConfig::default(),
//!     params,
//!     Arc::new(PgConnectionFactory::new()),
//! )
//! .await?;
//!
//! let rows = pool
//!     .execute_query(&Query::select("exercises").eq("category", "strength"))
//!     .await?;
//! println!("{} exercises", rows.len());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;

pub use connection::{BackendConnection, ConnectionFactory, ConnectionParams};
pub use pool::{ConnectionPool, HandleId, PoolStats, PooledConnection};
#[cfg(feature = "postgres")]
pub use postgres::{PgBackendConnection, PgConnectionFactory};
pub use query::{Filter, Order, Query, QueryOperation, Row, RpcArg};
