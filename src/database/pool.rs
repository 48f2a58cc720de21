//! # Connection Pool
//!
//! Bounded set of backend handles shared by concurrent callers.
//!
//! ## Overview
//!
//! - `initialize()` eagerly creates `min_connections` handles
//! - `acquire()` returns an idle handle, lazily creates one while fewer than
//!   `max_connections` exist, or waits for a release until `acquire_timeout`
//! - Release happens when the [`PooledConnection`] guard drops, on every exit
//!   path including errors, panics and cancelled futures
//!
//! Capacity is tracked with a FIFO [`Semaphore`] holding one permit per
//! possible handle. A release returns the handle to the idle set and then drops
//! its permit, which wakes exactly one waiter.
//!
//! `idle_timeout`, `retry_attempts` and `retry_delay` are carried in
//! [`PoolConfig`] but not acted on: handles are never reaped and `execute`
//! never retries.

use crate::config::PoolConfig;
use crate::database::connection::{BackendConnection, ConnectionFactory, ConnectionParams};
use crate::database::query::{Query, Row};
use crate::error::{DataError, Result};
use crate::metrics;
use futures::future::join_all;
use opentelemetry::KeyValue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Identifier of a handle within its pool
pub type HandleId = u64;

#[derive(Default)]
struct PoolState {
    handles: HashMap<HandleId, Arc<dyn BackendConnection>>,
    idle: Vec<HandleId>,
    busy: HashSet<HandleId>,
}

struct PoolInner {
    config: PoolConfig,
    params: ConnectionParams,
    factory: Arc<dyn ConnectionFactory>,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
    next_id: AtomicU64,
    closed: AtomicBool,
    acquired: AtomicU64,
    released: AtomicU64,
    timeouts: AtomicU64,
}

impl PoolInner {
    /// Move a busy handle back to idle. Returns false when the handle is not
    /// tracked as busy (already released, or the pool was closed meanwhile).
    fn release_handle(&self, id: HandleId) -> bool {
        let mut state = self.state.lock();
        if !state.busy.remove(&id) {
            return false;
        }
        state.idle.push(id);
        drop(state);

        self.released.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn next_id(&self) -> HandleId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Point-in-time pool snapshot; fields are read under one lock but the
/// counters are independent atomics, so the whole is best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total: usize,
    pub idle: usize,
    pub busy: usize,
    pub max: u32,
    pub min: u32,
    pub total_acquired: u64,
    pub total_released: u64,
    pub total_timeouts: u64,
}

impl PoolStats {
    /// Busy handles as a fraction of `max` (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            0.0
        } else {
            self.busy as f64 / self.max as f64
        }
    }

    pub fn utilization_percentage(&self) -> f64 {
        self.utilization() * 100.0
    }

    /// More than 80% of the maximum handles are busy
    pub fn is_under_stress(&self) -> bool {
        self.utilization() > 0.8
    }
}

/// A handle checked out of the pool
///
/// Dereferences to the backend connection. Dropping the guard returns the
/// handle to the idle set and wakes one waiting acquirer.
pub struct PooledConnection {
    id: HandleId,
    connection: Arc<dyn BackendConnection>,
    pool: Arc<PoolInner>,
    // dropped after `Drop::drop` has returned the handle to the idle set
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Return the handle to the pool now instead of at end of scope
    pub fn release(self) {}
}

impl Deref for PooledConnection {
    type Target = dyn BackendConnection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.pool.release_handle(self.id) {
            debug!(handle_id = self.id, "Release of untracked handle ignored");
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("connection", &self.connection)
            .finish()
    }
}

/// Bounded pool of backend handles
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("factory", &self.inner.factory.name())
            .field("params", &self.inner.params)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ConnectionPool {
    /// Create an empty pool; call [`ConnectionPool::initialize`] to pre-create
    /// `min_connections` handles.
    pub fn new(
        config: PoolConfig,
        params: ConnectionParams,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let permits = Arc::new(Semaphore::new(config.max_connections as usize));
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                params,
                factory,
                permits,
                state: Mutex::new(PoolState::default()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                timeouts: AtomicU64::new(0),
            }),
        })
    }

    /// Create and initialize in one step
    pub async fn connect(
        config: PoolConfig,
        params: ConnectionParams,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        let pool = Self::new(config, params, factory)?;
        pool.initialize().await?;
        Ok(pool)
    }

    /// Eagerly create handles up to `min_connections`.
    ///
    /// A factory failure here means the connection parameters are unusable and
    /// is reported as a non-retryable configuration error.
    pub async fn initialize(&self) -> Result<()> {
        let inner = &self.inner;
        let existing = inner.state.lock().handles.len();
        let wanted = (inner.config.min_connections as usize).saturating_sub(existing);

        for _ in 0..wanted {
            let connection = inner.factory.connect(&inner.params).await.map_err(|e| {
                DataError::configuration(format!(
                    "failed to create initial {} connection: {}",
                    inner.factory.name(),
                    e
                ))
            })?;

            let mut state = inner.state.lock();
            if state.handles.len() >= inner.config.max_connections as usize {
                break;
            }
            let id = inner.next_id();
            state.handles.insert(id, connection);
            state.idle.push(id);
        }

        info!(
            factory = inner.factory.name(),
            connections = inner.state.lock().handles.len(),
            min = inner.config.min_connections,
            max = inner.config.max_connections,
            "Database pool initialized"
        );
        Ok(())
    }

    /// Check out a handle, waiting at most `acquire_timeout` for capacity
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(DataError::PoolClosed);
        }

        let timeout = inner.config.acquire_timeout();
        let permit =
            match tokio::time::timeout(timeout, inner.permits.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(DataError::PoolClosed),
                Err(_) => {
                    inner.timeouts.fetch_add(1, Ordering::Relaxed);
                    metrics::database::pool_timeouts_total().add(1, &[]);
                    let stats = self.stats();
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        busy = stats.busy,
                        max = stats.max,
                        "Connection pool exhausted, acquire timed out"
                    );
                    return Err(DataError::ConnectionTimeout { timeout });
                }
            };

        let reused = {
            let mut guard = inner.state.lock();
            let state = &mut *guard;
            let found = state
                .idle
                .pop()
                .and_then(|id| state.handles.get(&id).map(|c| (id, Arc::clone(c))));
            if let Some((id, _)) = &found {
                state.busy.insert(*id);
            }
            found
        };

        let (id, connection, source) = match reused {
            Some((id, connection)) => (id, connection, "idle"),
            None => {
                // holding a permit with no idle handle means total < max
                let connection = inner
                    .factory
                    .connect(&inner.params)
                    .await
                    .map_err(DataError::Backend)?;
                let id = inner.next_id();

                let mut state = inner.state.lock();
                if inner.closed.load(Ordering::Acquire) {
                    return Err(DataError::PoolClosed);
                }
                state.handles.insert(id, Arc::clone(&connection));
                state.busy.insert(id);
                drop(state);

                debug!(handle_id = id, "Created pooled connection");
                (id, connection, "created")
            }
        };

        inner.acquired.fetch_add(1, Ordering::Relaxed);
        metrics::database::pool_checkouts_total().add(1, &[KeyValue::new("source", source)]);

        Ok(PooledConnection {
            id,
            connection,
            pool: Arc::clone(inner),
            _permit: permit,
        })
    }

    /// Return a handle to the pool. Equivalent to dropping the guard.
    pub fn release(&self, connection: PooledConnection) {
        drop(connection);
    }

    /// Run `operation` on a checked-out handle and release it afterwards,
    /// whatever the outcome. The operation's error is returned unchanged and
    /// nothing is retried.
    ///
    /// The handle passed to `operation` is lent for the duration of the call
    /// and must not be retained past it.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn BackendConnection>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let connection = self.acquire().await?;
        let result = operation(Arc::clone(&connection.connection)).await;
        drop(connection);

        if let Err(error) = &result {
            debug!(error = %error, "Database operation failed");
        }
        result
    }

    /// Execute a single query through [`ConnectionPool::execute`]
    pub async fn execute_query(&self, query: &Query) -> Result<Vec<Row>> {
        self.execute(|connection| async move {
            connection.execute(query).await.map_err(DataError::from)
        })
        .await
    }

    /// Check every tracked handle; healthy when at least one is live.
    ///
    /// Idle handles are checked out for the duration of their liveness check,
    /// which is bounded by `acquire_timeout`. Handles already checked out by
    /// another caller count as live and are never entered. Failing handles
    /// stay in the pool.
    pub async fn health_check(&self) -> bool {
        if self.is_closed() {
            return false;
        }

        let inner = &self.inner;
        let (claimed, in_use) = {
            let mut guard = inner.state.lock();
            let state = &mut *guard;
            let mut claimed = Vec::new();
            let mut remaining = Vec::new();
            for id in std::mem::take(&mut state.idle) {
                let permit = inner.permits.clone().try_acquire_owned();
                match (state.handles.get(&id), permit) {
                    (Some(connection), Ok(permit)) => {
                        state.busy.insert(id);
                        claimed.push(PooledConnection {
                            id,
                            connection: Arc::clone(connection),
                            pool: Arc::clone(inner),
                            _permit: permit,
                        });
                    }
                    // an acquirer already holds the permit for this handle
                    _ => remaining.push(id),
                }
            }
            state.idle = remaining;
            inner
                .acquired
                .fetch_add(claimed.len() as u64, Ordering::Relaxed);
            let in_use = state.handles.len() - claimed.len();
            (claimed, in_use)
        };

        if claimed.is_empty() && in_use == 0 {
            // nothing created yet: probe through a lazily created handle
            return match self.acquire().await {
                Ok(connection) => self.check_within_deadline(&connection).await,
                Err(error) => {
                    warn!(error = %error, "Database health check could not obtain a connection");
                    false
                }
            };
        }

        let results = join_all(claimed.iter().map(|c| self.check_within_deadline(c))).await;
        let live = results.iter().filter(|ok| **ok).count();
        drop(claimed);

        debug!(
            live = live,
            probed = results.len(),
            in_use = in_use,
            "Database health check completed"
        );
        live + in_use > 0
    }

    async fn check_within_deadline(&self, connection: &PooledConnection) -> bool {
        let deadline = self.inner.config.acquire_timeout();
        match tokio::time::timeout(deadline, connection.probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                warn!(handle_id = connection.id(), error = %error, "Connection probe failed");
                false
            }
            Err(_) => {
                warn!(
                    handle_id = connection.id(),
                    timeout_ms = deadline.as_millis() as u64,
                    "Connection probe timed out"
                );
                false
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        let state = inner.state.lock();
        PoolStats {
            total: state.handles.len(),
            idle: state.idle.len(),
            busy: state.busy.len(),
            max: inner.config.max_connections,
            min: inner.config.min_connections,
            total_acquired: inner.acquired.load(Ordering::Relaxed),
            total_released: inner.released.load(Ordering::Relaxed),
            total_timeouts: inner.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Drop every handle and fail pending and future acquires with
    /// [`DataError::PoolClosed`]. In-flight operations keep their handle
    /// until they finish; their release is then ignored.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.permits.close();

        let mut state = self.inner.state.lock();
        let total = state.handles.len();
        state.handles.clear();
        state.idle.clear();
        state.busy.clear();
        drop(state);

        info!(
            factory = self.inner.factory.name(),
            closed_connections = total,
            "Database pool closed"
        );
    }
}
