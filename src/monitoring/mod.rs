//! # Monitoring
//!
//! In-process query/latency counters, health aggregation and tuning
//! recommendations. Every tracked call is also recorded on the OpenTelemetry
//! instruments in [`crate::metrics`].

pub mod monitor;

pub use monitor::{
    recommendations_for, DatabaseMonitor, HealthReport, MetricsSnapshot, PerformanceReport,
    QueryMetrics, Recommendation, ReportSummary,
};
