//! # OpenTelemetry Metrics
//!
//! Domain-specific instruments recorded through the global meter provider:
//! - `database`: query counters, query duration, pool acquire outcomes
//! - `cache`: hit/miss counters and degraded-operation counts
//!
//! No exporter is installed here. Until the embedding application registers a
//! meter provider, the global no-op provider drops every measurement, so
//! recording is always safe.
//!
//! ```rust
//! use fitness_data::metrics;
//! use opentelemetry::KeyValue;
//!
//! metrics::database::queries_total().add(1, &[KeyValue::new("result", "success")]);
//! ```

pub mod cache;
pub mod database;
