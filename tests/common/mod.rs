//! Shared fakes for integration tests: an in-memory backend that understands
//! the structured [`Query`] model and a factory that hands out handles on it.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use fitness_data::cache::{CacheService, MemoryCacheStore};
use fitness_data::config::{CacheTtlConfig, PoolConfig};
use fitness_data::database::{
    BackendConnection, ConnectionFactory, ConnectionParams, ConnectionPool, Filter, Query,
    QueryOperation, Row,
};
use fitness_data::services::DataAccessService;
use fitness_data::{BackendError, CacheProvider};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tables of JSON rows plus call accounting and fault injection
#[derive(Debug, Default)]
pub struct MockBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    rpc_results: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<BackendError>>,
    overlapping_use: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, table: &str, row: Row) {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn set_rpc_result(&self, function: &str, result: Value) {
        self.rpc_results.lock().insert(function.to_string(), result);
    }

    /// Every query sleeps this long before answering
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Every query fails with `error` until cleared
    pub fn fail_with(&self, error: Option<BackendError>) {
        *self.failure.lock() = error;
    }

    /// Labels of every executed query, e.g. `select:user_profiles`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, label: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == label).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Times a handle was entered while another caller was still using it
    pub fn overlapping_use(&self) -> usize {
        self.overlapping_use.load(Ordering::SeqCst)
    }

    fn run(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        match &query.operation {
            QueryOperation::Probe => Ok(vec![json!(1)]),
            QueryOperation::Select => Ok(self.select(query)),
            QueryOperation::Insert(values) => Ok(vec![self.insert(&query.table, values)]),
            QueryOperation::Update(changes) => Ok(self.update(query, changes)),
            QueryOperation::Rpc(_) => Ok(self
                .rpc_results
                .lock()
                .get(&query.table)
                .cloned()
                .into_iter()
                .collect()),
        }
    }

    fn select(&self, query: &Query) -> Vec<Row> {
        let tables = self.tables.lock();
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| matches(row, &query.filters)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(&a[&order.column], &b[&order.column]);
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        rows
    }

    fn insert(&self, table: &str, values: &Value) -> Row {
        let now = Utc::now().to_rfc3339();
        let mut row = values.clone();
        if let Some(fields) = row.as_object_mut() {
            fields
                .entry("id")
                .or_insert_with(|| json!(Uuid::new_v4().to_string()));
            fields.entry("created_at").or_insert_with(|| json!(now.clone()));
            fields.entry("updated_at").or_insert_with(|| json!(now));
        }
        self.seed(table, row.clone());
        row
    }

    fn update(&self, query: &Query, changes: &Value) -> Vec<Row> {
        let mut tables = self.tables.lock();
        let Some(rows) = tables.get_mut(&query.table) else {
            return Vec::new();
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches(row, &query.filters)) {
            if let (Some(fields), Some(changes)) = (row.as_object_mut(), changes.as_object()) {
                for (column, value) in changes {
                    fields.insert(column.clone(), value.clone());
                }
                fields.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
            }
            updated.push(row.clone());
        }
        updated
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, value) => {
            let cell = as_text(&row[column.as_str()]);
            cell.is_some() && cell == as_text(value)
        }
        Filter::IsNull(column) => row[column.as_str()].is_null(),
    })
}

fn compare(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => CmpOrdering::Equal,
        (Value::Null, _) => CmpOrdering::Greater,
        (_, Value::Null) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}

/// One pooled handle on the shared backend
#[derive(Debug)]
pub struct MockConnection {
    backend: Arc<MockBackend>,
    in_use: AtomicBool,
}

#[async_trait]
impl BackendConnection for MockConnection {
    async fn execute(&self, query: &Query) -> Result<Vec<Row>, BackendError> {
        if self.in_use.swap(true, Ordering::SeqCst) {
            self.backend.overlapping_use.fetch_add(1, Ordering::SeqCst);
        }
        self.backend.calls.lock().push(query.label());

        let delay = *self.backend.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.backend.run(query);
        self.in_use.store(false, Ordering::SeqCst);
        result
    }
}

#[derive(Debug)]
pub struct MockConnectionFactory {
    backend: Arc<MockBackend>,
    created: AtomicUsize,
    refuse: AtomicBool,
}

impl MockConnectionFactory {
    pub fn new(backend: Arc<MockBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            created: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn connect(
        &self,
        _params: &ConnectionParams,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(BackendError::with_code("08001", "connection refused"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            backend: self.backend.clone(),
            in_use: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub fn pool_config(min: u32, max: u32, acquire_timeout_ms: u64) -> PoolConfig {
    PoolConfig {
        min_connections: min,
        max_connections: max,
        acquire_timeout_ms,
        ..PoolConfig::default()
    }
}

pub fn test_params() -> ConnectionParams {
    ConnectionParams::new("postgresql://test@localhost/fitness", None).unwrap()
}

pub async fn mock_pool(
    backend: &Arc<MockBackend>,
    config: PoolConfig,
) -> (ConnectionPool, Arc<MockConnectionFactory>) {
    let factory = MockConnectionFactory::new(backend.clone());
    let pool = ConnectionPool::connect(config, test_params(), factory.clone())
        .await
        .unwrap();
    (pool, factory)
}

/// Facade over a mock backend and a shared in-memory cache store
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub store: MemoryCacheStore,
    pub service: DataAccessService,
}

pub async fn harness() -> Harness {
    let backend = MockBackend::new();
    let (pool, _) = mock_pool(&backend, pool_config(1, 4, 500)).await;
    let store = MemoryCacheStore::new();
    let cache = CacheService::new(CacheProvider::from_memory(store.clone()));
    let service = DataAccessService::new(pool, cache, CacheTtlConfig::default());
    Harness {
        backend,
        store,
        service,
    }
}

pub fn timestamp(day: u32) -> String {
    format!("2024-03-{day:02}T10:00:00+00:00")
}

pub fn profile_row(id: Uuid, email: &str) -> Row {
    json!({
        "id": id.to_string(),
        "email": email,
        "full_name": "Test User",
        "fitness_goal": "endurance",
        "activity_level": "moderate",
        "created_at": timestamp(1),
        "updated_at": timestamp(1),
    })
}

pub fn workout_plan_row(id: Uuid, user_id: Uuid, name: &str, day: u32) -> Row {
    json!({
        "id": id.to_string(),
        "user_id": user_id.to_string(),
        "name": name,
        "duration_minutes": 45,
        "difficulty": "intermediate",
        "is_ai_generated": false,
        "created_at": timestamp(day),
        "updated_at": timestamp(day),
        "deleted_at": null,
    })
}

pub fn exercise_row(name: &str, category: &str) -> Row {
    json!({
        "id": Uuid::new_v4().to_string(),
        "name": name,
        "category": category,
        "difficulty": "beginner",
        "created_at": timestamp(1),
        "updated_at": timestamp(1),
    })
}

pub fn meal_row(name: &str, meal_type: &str, calories: f64) -> Row {
    json!({
        "id": Uuid::new_v4().to_string(),
        "name": name,
        "calories": calories,
        "meal_type": meal_type,
        "created_at": timestamp(1),
        "updated_at": timestamp(1),
    })
}
