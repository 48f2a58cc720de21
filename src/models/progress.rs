//! Progress metrics and the per-user activity summary.

use super::impl_record;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context attached to a progress measurement, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressMetadata {
    /// Body measurement such as weight or waist circumference
    BodyMeasurement {
        unit: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_part: Option<String>,
    },
    /// Performance recorded during a workout
    Workout {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exercise_id: Option<Uuid>,
    },
    /// Intake derived from nutrition logs
    Nutrition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meal_id: Option<Uuid>,
    },
    Note {
        text: String,
    },
}

/// Maps to `progress_analytics` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAnalytics {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric_name: String,
    pub metric_value: f64,
    pub measurement_date: NaiveDate,
    #[serde(default)]
    pub metadata: Option<ProgressMetadata>,
    pub created_at: DateTime<Utc>,
}

impl_record!(ProgressAnalytics, "progress_analytics", "progress metric");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProgressMetric {
    pub user_id: Uuid,
    pub metric_name: String,
    pub metric_value: f64,
    pub measurement_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProgressMetadata>,
}

/// Aggregate returned by the `get_user_activity_summary` stored function.
/// Missing counters decode as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserActivitySummary {
    pub total_workouts: i64,
    pub completed_workouts: i64,
    pub total_workout_minutes: i64,
    pub workouts_this_week: i64,
    pub nutrition_logs_this_week: i64,
    pub last_workout_at: Option<DateTime<Utc>>,
}
