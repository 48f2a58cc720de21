//! Cache instruments.

use opentelemetry::metrics::{Counter, Meter};
use std::sync::OnceLock;

static CACHE_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    CACHE_METER.get_or_init(|| opentelemetry::global::meter("fitdata-cache"))
}

/// Typed cache lookups
///
/// Labels:
/// - result: hit, miss
pub fn lookups_total() -> Counter<u64> {
    meter()
        .u64_counter("fitdata.cache.lookups.total")
        .with_description("Total number of typed cache lookups")
        .build()
}

/// Cache operations that failed and were absorbed
///
/// Labels:
/// - operation: get, set, delete, delete_pattern, ...
pub fn degraded_operations_total() -> Counter<u64> {
    meter()
        .u64_counter("fitdata.cache.degraded.total")
        .with_description("Cache operations that failed and degraded to a miss or no-op")
        .build()
}
