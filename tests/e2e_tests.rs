//! End-to-end scenarios over the full stack: facade, cache service, pool and
//! a mock backend.

mod common;

use common::*;
use fitness_data::database::Query;
use fitness_data::DataError;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn saturated_pool_rejects_the_third_caller_at_the_deadline() {
    let backend = MockBackend::new();
    let (pool, factory) = mock_pool(&backend, pool_config(2, 2, 50)).await;
    assert_eq!(factory.created(), 2);

    let holders: Vec<_> = (0..2)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.execute(|connection| async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    connection.execute(&Query::probe()).await.map_err(DataError::from)
                })
                .await
            })
        })
        .collect();

    // let both holders check out their handles
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(pool.stats().busy, 2);

    let started = Instant::now();
    let third = pool.execute_query(&Query::probe()).await;
    let waited = started.elapsed();

    match third {
        Err(DataError::ConnectionTimeout { timeout }) => {
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("expected a connection timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_millis(50));
    assert!(waited < Duration::from_millis(200));

    for holder in holders {
        holder.await.unwrap().unwrap();
    }
    assert_eq!(pool.stats().busy, 0);
    assert_eq!(factory.created(), 2);
}

#[tokio::test]
async fn repeated_profile_read_hits_backend_once() {
    let h = harness().await;
    let user_id = Uuid::new_v4();
    h.backend.seed("user_profiles", profile_row(user_id, "ada@example.com"));

    let first = h.service.get_user_profile(user_id).await.unwrap();
    let second = h.service.get_user_profile(user_id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.backend.call_count("select:user_profiles"), 1);
    let cache = h.service.cache().stats();
    assert_eq!(cache.misses, 1);
    assert_eq!(cache.hits, 1);
}

#[tokio::test]
async fn concurrent_facade_reads_share_a_small_pool() {
    let h = harness().await;
    h.backend.set_delay(Duration::from_millis(2));
    let users: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();
    for user in &users {
        h.backend.seed("user_profiles", profile_row(*user, "user@example.com"));
    }

    let tasks: Vec<_> = users
        .iter()
        .map(|user| {
            let service = h.service.clone();
            let user = *user;
            tokio::spawn(async move { service.get_user_profile(user).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }

    assert_eq!(h.backend.overlapping_use(), 0);
    let stats = h.service.stats().pool;
    assert!(stats.total <= 4);
    assert_eq!(stats.busy, 0);
}
