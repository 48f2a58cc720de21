//! # Data-Access Facade
//!
//! One method per entity operation. Reads are cache-aside: a cache hit returns
//! without touching the pool; a miss runs the query through the pool and
//! stores the result under the entity's key with its TTL tier. Writes go to the
//! backend first and then invalidate every cached view they affect.
//!
//! The backend is the only authority. Concurrent writers race on cache content
//! (last write wins) and there is no read-after-write guarantee through the
//! cache beyond the invalidation performed here.

use crate::cache::{CacheKeys, CacheService, CacheStats};
use crate::config::{CacheTtlConfig, DataLayerConfig};
use crate::database::{ConnectionFactory, ConnectionParams, ConnectionPool, PoolStats, Query, Row};
use crate::error::{DataError, Result};
use crate::logging::log_data_operation;
use crate::models::{
    Exercise, ExerciseCategory, Meal, MealType, NewNutritionLog, NewNutritionPlan,
    NewProgressMetric, NewUserPhoto, NewWorkoutPlan, NewWorkoutSession, NutritionLog,
    NutritionPlan, ProgressAnalytics, Record, UpdateNutritionPlan, UpdateUserProfile,
    UpdateWorkoutPlan, UserActivitySummary, UserPhoto, UserProfile, WorkoutPlan, WorkoutSession,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Default page size for session and nutrition log history
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

const ACTIVITY_SUMMARY_FUNCTION: &str = "get_user_activity_summary";

/// Pool and cache snapshot for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccessStats {
    pub pool: PoolStats,
    pub cache: CacheStats,
}

/// Cache-aside facade over the connection pool and cache service
#[derive(Debug, Clone)]
pub struct DataAccessService {
    pool: ConnectionPool,
    cache: CacheService,
    ttl: CacheTtlConfig,
}

fn decode<T: DeserializeOwned>(entity: &'static str, row: Row) -> Result<T> {
    serde_json::from_value(row).map_err(|e| DataError::decode(entity, e))
}

fn decode_rows<T: Record>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(|row| decode(T::ENTITY, row)).collect()
}

fn first_row<T: Record>(rows: Vec<Row>) -> Result<Option<T>> {
    rows.into_iter()
        .next()
        .map(|row| decode(T::ENTITY, row))
        .transpose()
}

fn to_changes<T: Serialize>(entity: &'static str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| DataError::decode(entity, e))
}

fn has_changes(changes: &Value) -> bool {
    changes.as_object().is_some_and(|fields| !fields.is_empty())
}

impl DataAccessService {
    pub fn new(pool: ConnectionPool, cache: CacheService, ttl: CacheTtlConfig) -> Self {
        Self { pool, cache, ttl }
    }

    /// Build the pool (initialized to `min_connections`) and the cache from
    /// configuration. Cache problems never fail construction.
    pub async fn from_config(
        config: &DataLayerConfig,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let params = ConnectionParams::from_config(&config.database)?;
        let pool = ConnectionPool::connect(config.database.pool.clone(), params, factory).await?;
        let cache = CacheService::from_config(&config.cache).await;

        info!(
            pool_max = config.database.pool.max_connections,
            cache_provider = cache.provider_name(),
            "Data access service ready"
        );
        Ok(Self::new(pool, cache, config.cache.ttl.clone()))
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    async fn cached_list<T: Record>(
        &self,
        key: String,
        ttl: Duration,
        query: Query,
    ) -> Result<Vec<T>> {
        if let Some(cached) = self.cache.get::<Vec<T>>(&key).await {
            return Ok(cached);
        }

        let records: Vec<T> = decode_rows(self.pool.execute_query(&query).await?)?;
        self.cache.set(&key, &records, Some(ttl)).await;
        debug!(key = %key, count = records.len(), "Loaded list from backend");
        Ok(records)
    }

    /// Zero rows is `Ok(None)` and nothing is cached
    async fn cached_single<T: Record>(
        &self,
        key: String,
        ttl: Duration,
        query: Query,
    ) -> Result<Option<T>> {
        if let Some(cached) = self.cache.get::<T>(&key).await {
            return Ok(Some(cached));
        }

        let record: Option<T> = first_row(self.pool.execute_query(&query.single()).await?)?;
        if let Some(record) = &record {
            self.cache.set(&key, record, Some(ttl)).await;
        }
        Ok(record)
    }

    async fn insert<T: Record, N: Serialize>(&self, new_record: &N) -> Result<T> {
        let started = Instant::now();
        let values = to_changes(T::ENTITY, new_record)?;
        let rows = self.pool.execute_query(&Query::insert(T::TABLE, values)).await?;
        let record = first_row::<T>(rows)?.ok_or_else(|| {
            DataError::decode(T::ENTITY, "insert returned no row")
        })?;

        log_data_operation(
            "insert",
            T::ENTITY,
            None,
            "success",
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        Ok(record)
    }

    async fn update_by_id<T: Record>(&self, id: Uuid, changes: Value) -> Result<Option<T>> {
        let started = Instant::now();
        let query = Query::update(T::TABLE, changes).eq("id", id.to_string());
        let record = first_row::<T>(self.pool.execute_query(&query).await?)?;

        log_data_operation(
            "update",
            T::ENTITY,
            Some(&id.to_string()),
            if record.is_some() { "success" } else { "not_found" },
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        Ok(record)
    }

    // =========================================================================
    // User profile
    // =========================================================================

    pub async fn get_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let user_id = user_id.to_string();
        self.cached_single(
            CacheKeys::user_profile(&user_id),
            self.ttl.user_profile(),
            Query::select(UserProfile::TABLE).eq("id", user_id),
        )
        .await
    }

    /// Apply a partial update and drop every cached view of the user.
    /// An update with no fields set reads the current profile instead.
    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        updates: &UpdateUserProfile,
    ) -> Result<Option<UserProfile>> {
        let changes = to_changes(UserProfile::ENTITY, updates)?;
        if !has_changes(&changes) {
            return self.get_user_profile(user_id).await;
        }

        let profile = self.update_by_id::<UserProfile>(user_id, changes).await?;
        if profile.is_some() {
            self.cache.invalidate_user(&user_id.to_string()).await;
        }
        Ok(profile)
    }

    /// Progress photos, most recently taken first
    pub async fn get_user_photos(&self, user_id: Uuid) -> Result<Vec<UserPhoto>> {
        let user_id = user_id.to_string();
        self.cached_list(
            CacheKeys::user_photos(&user_id),
            self.ttl.medium(),
            Query::select(UserPhoto::TABLE)
                .eq("user_id", user_id)
                .order_by("taken_at", false),
        )
        .await
    }

    pub async fn add_user_photo(&self, photo: &NewUserPhoto) -> Result<UserPhoto> {
        let created: UserPhoto = self.insert(photo).await?;
        self.cache.invalidate_user(&photo.user_id.to_string()).await;
        Ok(created)
    }

    // =========================================================================
    // Workout plans
    // =========================================================================

    /// Non-deleted plans, newest first
    pub async fn get_workout_plans(&self, user_id: Uuid) -> Result<Vec<WorkoutPlan>> {
        let user_id = user_id.to_string();
        self.cached_list(
            CacheKeys::workout_plans(&user_id),
            self.ttl.workout_plans(),
            Query::select(WorkoutPlan::TABLE)
                .eq("user_id", user_id)
                .is_null("deleted_at")
                .order_by("created_at", false),
        )
        .await
    }

    pub async fn get_workout_plan(&self, plan_id: Uuid) -> Result<Option<WorkoutPlan>> {
        let plan_id = plan_id.to_string();
        self.cached_single(
            CacheKeys::workout_plan(&plan_id),
            self.ttl.workout_plans(),
            Query::select(WorkoutPlan::TABLE)
                .eq("id", plan_id)
                .is_null("deleted_at"),
        )
        .await
    }

    pub async fn create_workout_plan(&self, plan: &NewWorkoutPlan) -> Result<WorkoutPlan> {
        let created: WorkoutPlan = self.insert(plan).await?;
        self.cache.invalidate_user(&plan.user_id.to_string()).await;
        Ok(created)
    }

    pub async fn update_workout_plan(
        &self,
        plan_id: Uuid,
        updates: &UpdateWorkoutPlan,
    ) -> Result<Option<WorkoutPlan>> {
        let changes = to_changes(WorkoutPlan::ENTITY, updates)?;
        if !has_changes(&changes) {
            return self.get_workout_plan(plan_id).await;
        }

        let plan = self.update_by_id::<WorkoutPlan>(plan_id, changes).await?;
        if plan.is_some() {
            self.cache.invalidate_workout_plan(&plan_id.to_string()).await;
        }
        Ok(plan)
    }

    // =========================================================================
    // Nutrition plans
    // =========================================================================

    pub async fn get_nutrition_plans(&self, user_id: Uuid) -> Result<Vec<NutritionPlan>> {
        let user_id = user_id.to_string();
        self.cached_list(
            CacheKeys::nutrition_plans(&user_id),
            self.ttl.nutrition_plans(),
            Query::select(NutritionPlan::TABLE)
                .eq("user_id", user_id)
                .is_null("deleted_at")
                .order_by("created_at", false),
        )
        .await
    }

    pub async fn get_nutrition_plan(&self, plan_id: Uuid) -> Result<Option<NutritionPlan>> {
        let plan_id = plan_id.to_string();
        self.cached_single(
            CacheKeys::nutrition_plan(&plan_id),
            self.ttl.nutrition_plans(),
            Query::select(NutritionPlan::TABLE)
                .eq("id", plan_id)
                .is_null("deleted_at"),
        )
        .await
    }

    pub async fn create_nutrition_plan(&self, plan: &NewNutritionPlan) -> Result<NutritionPlan> {
        let created: NutritionPlan = self.insert(plan).await?;
        self.cache.invalidate_user(&plan.user_id.to_string()).await;
        Ok(created)
    }

    pub async fn update_nutrition_plan(
        &self,
        plan_id: Uuid,
        updates: &UpdateNutritionPlan,
    ) -> Result<Option<NutritionPlan>> {
        let changes = to_changes(NutritionPlan::ENTITY, updates)?;
        if !has_changes(&changes) {
            return self.get_nutrition_plan(plan_id).await;
        }

        let plan = self.update_by_id::<NutritionPlan>(plan_id, changes).await?;
        if plan.is_some() {
            self.cache.invalidate_nutrition_plan(&plan_id.to_string()).await;
        }
        Ok(plan)
    }

    // =========================================================================
    // Reference data
    // =========================================================================

    /// Exercise catalog ordered by name, optionally filtered by category
    pub async fn get_exercises(&self, category: Option<ExerciseCategory>) -> Result<Vec<Exercise>> {
        let category = category.map(|c| c.as_str());
        let mut query = Query::select(Exercise::TABLE);
        if let Some(category) = category {
            query = query.eq("category", category);
        }

        self.cached_list(
            CacheKeys::exercises(category),
            self.ttl.exercises(),
            query.order_by("name", true),
        )
        .await
    }

    pub async fn get_meals(&self, meal_type: Option<MealType>) -> Result<Vec<Meal>> {
        let meal_type = meal_type.map(|m| m.as_str());
        let mut query = Query::select(Meal::TABLE);
        if let Some(meal_type) = meal_type {
            query = query.eq("meal_type", meal_type);
        }

        self.cached_list(
            CacheKeys::meals(meal_type),
            self.ttl.meals(),
            query.order_by("name", true),
        )
        .await
    }

    // =========================================================================
    // Workout sessions and nutrition logs
    // =========================================================================

    /// Most recent sessions first; `limit` defaults to [`DEFAULT_HISTORY_LIMIT`]
    pub async fn get_workout_sessions(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WorkoutSession>> {
        let user_id = user_id.to_string();
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.cached_list(
            CacheKeys::workout_sessions(&user_id, Some(limit)),
            self.ttl.medium(),
            Query::select(WorkoutSession::TABLE)
                .eq("user_id", user_id)
                .order_by("started_at", false)
                .limit(limit),
        )
        .await
    }

    pub async fn create_workout_session(
        &self,
        session: &NewWorkoutSession,
    ) -> Result<WorkoutSession> {
        let created: WorkoutSession = self.insert(session).await?;
        self.cache.invalidate_user(&session.user_id.to_string()).await;
        Ok(created)
    }

    pub async fn get_nutrition_logs(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<NutritionLog>> {
        let user_id = user_id.to_string();
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.cached_list(
            CacheKeys::nutrition_logs(&user_id, Some(limit)),
            self.ttl.medium(),
            Query::select(NutritionLog::TABLE)
                .eq("user_id", user_id)
                .order_by("consumed_at", false)
                .limit(limit),
        )
        .await
    }

    pub async fn create_nutrition_log(&self, log: &NewNutritionLog) -> Result<NutritionLog> {
        let created: NutritionLog = self.insert(log).await?;
        self.cache.invalidate_user(&log.user_id.to_string()).await;
        Ok(created)
    }

    // =========================================================================
    // Progress analytics
    // =========================================================================

    /// Measurements newest first, optionally for a single metric
    pub async fn get_progress_analytics(
        &self,
        user_id: Uuid,
        metric: Option<&str>,
    ) -> Result<Vec<ProgressAnalytics>> {
        let user_id = user_id.to_string();
        let metric = metric.filter(|m| !m.is_empty());
        let mut query = Query::select(ProgressAnalytics::TABLE).eq("user_id", user_id.as_str());
        if let Some(metric) = metric {
            query = query.eq("metric_name", metric);
        }

        self.cached_list(
            CacheKeys::progress_analytics(&user_id, metric),
            self.ttl.progress_analytics(),
            query.order_by("measurement_date", false),
        )
        .await
    }

    pub async fn record_progress_metric(
        &self,
        metric: &NewProgressMetric,
    ) -> Result<ProgressAnalytics> {
        let created: ProgressAnalytics = self.insert(metric).await?;
        self.cache.invalidate_user(&metric.user_id.to_string()).await;
        Ok(created)
    }

    /// Aggregate from the `get_user_activity_summary` stored function, cached
    /// on the short tier
    pub async fn get_user_activity_summary(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserActivitySummary>> {
        let key = CacheKeys::user_activity_summary(&user_id.to_string());
        if let Some(cached) = self.cache.get::<UserActivitySummary>(&key).await {
            return Ok(Some(cached));
        }

        let query = Query::rpc(ACTIVITY_SUMMARY_FUNCTION).typed_arg(
            "user_uuid",
            user_id.to_string(),
            "uuid",
        );
        let summary = match self.pool.execute_query(&query).await?.into_iter().next() {
            Some(Value::Null) | None => None,
            Some(row) => Some(decode::<UserActivitySummary>("activity summary", row)?),
        };

        if let Some(summary) = &summary {
            self.cache.set(&key, summary, Some(self.ttl.short())).await;
        }
        Ok(summary)
    }

    // =========================================================================
    // Cache management and diagnostics
    // =========================================================================

    /// Drop every cached view of one user; returns the number of keys removed
    pub async fn clear_user_cache(&self, user_id: Uuid) -> u64 {
        self.cache.invalidate_user(&user_id.to_string()).await
    }

    pub async fn clear_all_cache(&self) -> u64 {
        let removed = self.cache.clear_all().await;
        info!(removed = removed, "Cleared all cached data");
        removed
    }

    /// Healthy when at least one pooled handle answers and the cache pings
    pub async fn health_check(&self) -> bool {
        let (database, cache) = tokio::join!(self.pool.health_check(), self.cache.ping());
        database && cache
    }

    pub fn stats(&self) -> DataAccessStats {
        DataAccessStats {
            pool: self.pool.stats(),
            cache: self.cache.stats(),
        }
    }
}
