//! # Fitness Entity Models
//!
//! Immutable records returned by the data-access facade, plus the request
//! types used to create or change them. Records deserialize from backend rows
//! (JSON objects keyed by column name); every update yields a fresh record.

pub mod nutrition;
pub mod progress;
pub mod reference;
pub mod user;
pub mod workout;

pub use nutrition::{NewNutritionLog, NewNutritionPlan, NutritionLog, NutritionPlan, UpdateNutritionPlan};
pub use progress::{NewProgressMetric, ProgressAnalytics, ProgressMetadata, UserActivitySummary};
pub use reference::{DifficultyLevel, Exercise, ExerciseCategory, Meal, MealType};
pub use user::{ActivityLevel, FitnessGoal, NewUserPhoto, UpdateUserProfile, UserPhoto, UserProfile};
pub use workout::{NewWorkoutPlan, NewWorkoutSession, UpdateWorkoutPlan, WorkoutPlan, WorkoutSession};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record stored in one backend table
pub trait Record: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Backend table name
    const TABLE: &'static str;
    /// Human-readable entity name for logs and decode errors
    const ENTITY: &'static str;
}

macro_rules! impl_record {
    ($ty:ty, $table:literal, $entity:literal) => {
        impl $crate::models::Record for $ty {
            const TABLE: &'static str = $table;
            const ENTITY: &'static str = $entity;
        }
    };
}
pub(crate) use impl_record;
