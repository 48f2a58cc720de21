//! Reference data shared by every user: the exercise and meal catalogs.

use super::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Strength,
    Cardio,
    Flexibility,
    SportSpecific,
}

impl ExerciseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Cardio => "cardio",
            Self::Flexibility => "flexibility",
            Self::SportSpecific => "sport_specific",
        }
    }
}

impl fmt::Display for ExerciseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    PreWorkout,
    PostWorkout,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
            Self::PreWorkout => "pre_workout",
            Self::PostWorkout => "post_workout",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps to `exercises` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ExerciseCategory,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub calories_per_minute: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Exercise, "exercises", "exercise");

/// Maps to `meals` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub calories: f64,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub prep_time_minutes: Option<i32>,
    pub meal_type: MealType,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Meal, "meals", "meal");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_values_match_serialized_names() {
        for category in [
            ExerciseCategory::Strength,
            ExerciseCategory::SportSpecific,
        ] {
            assert_eq!(
                serde_json::to_value(category).unwrap(),
                serde_json::Value::String(category.to_string())
            );
        }
        assert_eq!(
            serde_json::to_value(MealType::PreWorkout).unwrap(),
            serde_json::Value::String(MealType::PreWorkout.to_string())
        );
    }
}
