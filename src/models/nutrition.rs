use super::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Daily macro targets for a user
/// Maps to `nutrition_plans` table; soft-deleted rows carry `deleted_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub daily_calories: i32,
    pub daily_protein: Option<f64>,
    pub daily_carbs: Option<f64>,
    pub daily_fat: Option<f64>,
    pub daily_fiber: Option<f64>,
    #[serde(default)]
    pub is_ai_generated: bool,
    pub ai_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_record!(NutritionPlan, "nutrition_plans", "nutrition plan");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNutritionPlan {
    pub user_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub daily_calories: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_fiber: Option<f64>,
    pub is_ai_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateNutritionPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_calories: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_fiber: Option<f64>,
}

/// A meal eaten by a user
/// Maps to `nutrition_logs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_id: Uuid,
    pub consumed_at: DateTime<Utc>,
    pub quantity: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl_record!(NutritionLog, "nutrition_logs", "nutrition log");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNutritionLog {
    pub user_id: Uuid,
    pub meal_id: Uuid,
    pub consumed_at: DateTime<Utc>,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
