mod common;

use common::*;
use fitness_data::cache::{CacheProvider, CacheService};
use fitness_data::database::Query;
use fitness_data::monitoring::{DatabaseMonitor, Recommendation};
use fitness_data::{BackendError, DataError};
use std::time::Duration;
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn tracked_average_is_the_mean_of_observed_latencies() {
    let h = harness().await;
    let monitor = DatabaseMonitor::for_service(&h.service);

    for delay_ms in [10u64, 20, 60] {
        let result: Result<(), DataError> = monitor
            .track_query("sleep", || async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(())
            })
            .await;
        result.unwrap();
    }

    let metrics = monitor.query_metrics();
    assert_eq!(metrics.query_count, 3);
    assert_eq!(metrics.error_count, 0);
    assert!((metrics.average_query_time_ms - 30.0).abs() < 2.0);
}

#[tokio::test]
async fn one_failure_among_many_is_counted_once_and_reraised() {
    let h = harness().await;
    let monitor = DatabaseMonitor::for_service(&h.service);

    for attempt in 0..5 {
        let user_id = Uuid::new_v4();
        if attempt == 2 {
            h.backend.fail_with(Some(BackendError::new("connection reset")));
        }
        let result = monitor
            .track_query("get_workout_plans", || h.service.get_workout_plans(user_id))
            .await;
        if attempt == 2 {
            assert!(matches!(result, Err(DataError::Backend(_))));
            h.backend.fail_with(None);
        } else {
            assert!(result.is_ok());
        }
    }

    let metrics = monitor.query_metrics();
    assert_eq!(metrics.query_count, 5);
    assert_eq!(metrics.error_count, 1);
    assert!((metrics.error_rate() - 0.2).abs() < 1e-9);
}

#[tokio::test]
async fn cache_operations_are_timed_but_not_counted() {
    let h = harness().await;
    let monitor = DatabaseMonitor::for_service(&h.service);

    let meal_ids = vec![1, 2];
    let stored = monitor
        .track_cache_operation("set", "meals", || {
            h.service.cache().set("meals", &meal_ids, None)
        })
        .await;
    assert!(stored);
    assert_eq!(monitor.query_metrics().query_count, 0);
}

#[tokio::test]
async fn health_report_combines_pool_and_cache() {
    let h = harness().await;
    let monitor = DatabaseMonitor::for_service(&h.service);

    let report = monitor.health_check().await;
    assert!(report.database && report.cache && report.overall);

    h.backend.fail_with(Some(BackendError::new("database is shutting down")));
    let report = monitor.health_check().await;
    assert!(!report.database);
    assert!(report.cache);
    assert!(!report.overall);
}

#[tokio::test]
async fn snapshot_reset_and_report() {
    let h = harness().await;
    let monitor = DatabaseMonitor::for_service(&h.service);
    let user_id = Uuid::new_v4();
    h.backend.seed("user_profiles", profile_row(user_id, "ada@example.com"));

    for _ in 0..2 {
        monitor
            .track_query("get_user_profile", || h.service.get_user_profile(user_id))
            .await
            .unwrap();
    }

    let snapshot = monitor.metrics();
    assert_eq!(snapshot.queries.query_count, 2);
    assert_eq!(snapshot.cache_hit_rate, Some(0.5));
    assert_eq!(snapshot.pool.max, 4);

    let report = monitor.report().await;
    assert_eq!(report.summary.total_queries, 2);
    assert_eq!(report.summary.error_rate, "0.00%");
    assert_eq!(report.summary.cache_hit_rate, "50.00%");
    assert_eq!(report.summary.connection_pool_utilization, "0.00%");
    assert!(report
        .recommendations
        .contains(&Recommendation::ReviewCacheStrategy.to_string()));
    assert!(report.health.overall);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"]["total_queries"], 2);

    monitor.reset_metrics();
    let snapshot = monitor.metrics();
    assert_eq!(snapshot.queries.query_count, 0);
    assert_eq!(snapshot.cache_hit_rate, None);
    assert_eq!(monitor.report().await.summary.cache_hit_rate, "n/a");
}

#[tokio::test]
async fn saturated_pool_recommends_more_connections() {
    let backend = MockBackend::new();
    let (pool, _) = mock_pool(&backend, pool_config(0, 4, 100)).await;
    let monitor = DatabaseMonitor::new(pool.clone(), CacheService::new(CacheProvider::memory()));

    let mut held = Vec::new();
    for _ in 0..4 {
        held.push(pool.acquire().await.unwrap());
    }
    let recommendations = monitor.recommendations();
    assert!(recommendations.contains(&Recommendation::IncreaseMaxConnections));
    assert!(!recommendations.contains(&Recommendation::IncreaseMinConnections));

    drop(held.pop());
    pool.execute_query(&Query::probe()).await.unwrap();
    assert!(!monitor
        .recommendations()
        .contains(&Recommendation::IncreaseMaxConnections));
}
