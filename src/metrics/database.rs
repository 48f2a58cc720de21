//! Query and connection-pool instruments.

use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::sync::OnceLock;

static DATABASE_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    DATABASE_METER.get_or_init(|| opentelemetry::global::meter("fitdata-database"))
}

/// Total number of monitored queries
///
/// Labels:
/// - query: operation name passed to the monitor
/// - result: success, error
pub fn queries_total() -> Counter<u64> {
    meter()
        .u64_counter("fitdata.queries.total")
        .with_description("Total number of monitored data-layer queries")
        .build()
}

/// Monitored query duration in milliseconds
pub fn query_duration() -> Histogram<f64> {
    meter()
        .f64_histogram("fitdata.query.duration")
        .with_description("Monitored data-layer query duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Total number of pool checkouts
///
/// Labels:
/// - source: idle, created
pub fn pool_checkouts_total() -> Counter<u64> {
    meter()
        .u64_counter("fitdata.pool.checkouts.total")
        .with_description("Total number of connection pool checkouts")
        .build()
}

/// Total number of acquires that gave up at the acquire deadline
pub fn pool_timeouts_total() -> Counter<u64> {
    meter()
        .u64_counter("fitdata.pool.timeouts.total")
        .with_description("Total number of connection pool acquire timeouts")
        .build()
}
