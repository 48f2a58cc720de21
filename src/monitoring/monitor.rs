//! # Database Monitor
//!
//! Wraps data-layer calls to accumulate query count, cumulative average latency
//! and error count, and derives health, tuning recommendations and a formatted
//! report from those counters plus the live pool and cache statistics.

use crate::cache::CacheService;
use crate::database::{ConnectionPool, PoolStats};
use crate::logging::log_error;
use crate::metrics;
use crate::services::DataAccessService;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Pool utilization above which raising `max_connections` is suggested
pub const HIGH_UTILIZATION_THRESHOLD: f64 = 0.8;
/// Average latency (ms) above which query optimization is suggested
pub const SLOW_QUERY_THRESHOLD_MS: f64 = 1000.0;
/// Error ratio above which connectivity should be checked
pub const HIGH_ERROR_RATE_THRESHOLD: f64 = 0.1;
/// Hit rate below which TTLs and key design should be reviewed
pub const LOW_HIT_RATE_THRESHOLD: f64 = 0.7;

/// Query counters accumulated by [`DatabaseMonitor::track_query`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub query_count: u64,
    pub average_query_time_ms: f64,
    pub error_count: u64,
}

impl QueryMetrics {
    /// Fraction of tracked queries that failed; zero before the first query
    pub fn error_rate(&self) -> f64 {
        if self.query_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.query_count as f64
        }
    }

    fn record(&mut self, elapsed_ms: f64, failed: bool) {
        self.query_count += 1;
        let n = self.query_count as f64;
        self.average_query_time_ms = (self.average_query_time_ms * (n - 1.0) + elapsed_ms) / n;
        if failed {
            self.error_count += 1;
        }
    }
}

/// Point-in-time view of every counter the monitor reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub queries: QueryMetrics,
    /// `None` until the cache has served at least one lookup
    pub cache_hit_rate: Option<f64>,
    pub pool: PoolStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub database: bool,
    pub cache: bool,
    pub overall: bool,
}

/// Tuning suggestion derived from current metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    IncreaseMaxConnections,
    IncreaseMinConnections,
    OptimizeQueries,
    CheckConnectivity,
    ReviewCacheStrategy,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::IncreaseMaxConnections => "Consider increasing max connections in the pool",
            Self::IncreaseMinConnections => "Consider increasing min connections in the pool",
            Self::OptimizeQueries => "Average query time is high, consider optimizing queries",
            Self::CheckConnectivity => "High error rate detected, check database connectivity",
            Self::ReviewCacheStrategy => {
                "Low cache hit rate, consider adjusting cache TTL or keys"
            }
        };
        f.write_str(message)
    }
}

/// Human-readable figures for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_queries: u64,
    pub average_query_time: String,
    pub error_rate: String,
    pub cache_hit_rate: String,
    pub connection_pool_utilization: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub summary: ReportSummary,
    pub recommendations: Vec<String>,
    pub health: HealthReport,
    pub generated_at: DateTime<Utc>,
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 DATA LAYER PERFORMANCE REPORT ({})", self.generated_at.to_rfc3339())?;
        writeln!(f, "Total Queries: {}", self.summary.total_queries)?;
        writeln!(f, "Average Query Time: {}", self.summary.average_query_time)?;
        writeln!(f, "Error Rate: {}", self.summary.error_rate)?;
        writeln!(f, "Cache Hit Rate: {}", self.summary.cache_hit_rate)?;
        writeln!(
            f,
            "Connection Pool Utilization: {}",
            self.summary.connection_pool_utilization
        )?;
        writeln!(
            f,
            "Health: database={} cache={} overall={}",
            self.health.database, self.health.cache, self.health.overall
        )?;
        if self.recommendations.is_empty() {
            write!(f, "Recommendations: none")
        } else {
            write!(f, "Recommendations:")?;
            for recommendation in &self.recommendations {
                write!(f, "\n  - {recommendation}")?;
            }
            Ok(())
        }
    }
}

/// Latency and error tracking over one pool and one cache
#[derive(Debug, Clone)]
pub struct DatabaseMonitor {
    pool: ConnectionPool,
    cache: CacheService,
    queries: Arc<Mutex<QueryMetrics>>,
}

impl DatabaseMonitor {
    pub fn new(pool: ConnectionPool, cache: CacheService) -> Self {
        Self {
            pool,
            cache,
            queries: Arc::new(Mutex::new(QueryMetrics::default())),
        }
    }

    /// Monitor the pool and cache behind a facade
    pub fn for_service(service: &DataAccessService) -> Self {
        Self::new(service.pool().clone(), service.cache().clone())
    }

    /// Invoke `operation`, record its latency and outcome, and return its
    /// result unchanged. Failed calls count toward the average too.
    pub async fn track_query<T, E, F, Fut>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let started = Instant::now();
        let result = operation().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.queries.lock().record(elapsed_ms, result.is_err());

        let outcome = if result.is_ok() { "success" } else { "error" };
        let labels = [
            KeyValue::new("query", name.to_string()),
            KeyValue::new("result", outcome),
        ];
        metrics::database::queries_total().add(1, &labels);
        metrics::database::query_duration().record(elapsed_ms, &labels);

        match &result {
            Ok(_) => debug!(query = name, duration_ms = elapsed_ms, "Query completed"),
            Err(e) => log_error(
                "monitor",
                name,
                &e.to_string(),
                Some(&format!("duration_ms={elapsed_ms:.2}")),
            ),
        }
        result
    }

    /// Time a cache operation; only logged, never counted as a query
    pub async fn track_cache_operation<T, F, Fut>(&self, operation: &str, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let started = Instant::now();
        let result = f().await;
        debug!(
            operation = operation,
            key = key,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Cache operation completed"
        );
        result
    }

    pub fn query_metrics(&self) -> QueryMetrics {
        *self.queries.lock()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.query_metrics(),
            cache_hit_rate: self.cache.hit_rate(),
            pool: self.pool.stats(),
            timestamp: Utc::now(),
        }
    }

    /// Zero the query counters and the cache hit/miss counters
    pub fn reset_metrics(&self) {
        *self.queries.lock() = QueryMetrics::default();
        self.cache.reset_stats();
    }

    pub async fn health_check(&self) -> HealthReport {
        let (database, cache) = tokio::join!(self.pool.health_check(), self.cache.ping());
        HealthReport {
            database,
            cache,
            overall: database && cache,
        }
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        recommendations_for(&self.metrics())
    }

    pub async fn report(&self) -> PerformanceReport {
        let health = self.health_check().await;
        let snapshot = self.metrics();
        let recommendations = recommendations_for(&snapshot)
            .iter()
            .map(ToString::to_string)
            .collect();

        PerformanceReport {
            summary: ReportSummary {
                total_queries: snapshot.queries.query_count,
                average_query_time: format!("{:.2}ms", snapshot.queries.average_query_time_ms),
                error_rate: format!("{:.2}%", snapshot.queries.error_rate() * 100.0),
                cache_hit_rate: snapshot
                    .cache_hit_rate
                    .map_or_else(|| "n/a".to_string(), |rate| format!("{:.2}%", rate * 100.0)),
                connection_pool_utilization: format!(
                    "{:.2}%",
                    snapshot.pool.utilization_percentage()
                ),
            },
            recommendations,
            health,
            generated_at: snapshot.timestamp,
        }
    }
}

/// Derive recommendations from a snapshot
pub fn recommendations_for(snapshot: &MetricsSnapshot) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let pool = &snapshot.pool;

    if pool.utilization() > HIGH_UTILIZATION_THRESHOLD {
        recommendations.push(Recommendation::IncreaseMaxConnections);
    }
    if pool.idle == 0 && (pool.busy as u64) < u64::from(pool.max) {
        recommendations.push(Recommendation::IncreaseMinConnections);
    }
    if snapshot.queries.average_query_time_ms > SLOW_QUERY_THRESHOLD_MS {
        recommendations.push(Recommendation::OptimizeQueries);
    }
    if snapshot.queries.error_rate() > HIGH_ERROR_RATE_THRESHOLD {
        recommendations.push(Recommendation::CheckConnectivity);
    }
    if snapshot
        .cache_hit_rate
        .is_some_and(|rate| rate < LOW_HIT_RATE_THRESHOLD)
    {
        recommendations.push(Recommendation::ReviewCacheStrategy);
    }

    recommendations
}
