//! # Services
//!
//! Entity-level operations built on the pool and the cache.

pub mod data_access;

pub use data_access::{DataAccessService, DataAccessStats, DEFAULT_HISTORY_LIMIT};
