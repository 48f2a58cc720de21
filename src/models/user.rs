use super::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    WeightLoss,
    MuscleGain,
    Endurance,
    SportPerformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

/// A user's profile, keyed by the user id
/// Maps to `user_profiles` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub age: Option<i32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub fitness_goal: Option<FitnessGoal>,
    pub activity_level: Option<ActivityLevel>,
    #[serde(default)]
    pub medical_conditions: Vec<String>,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(UserProfile, "user_profiles", "user profile");

/// Partial profile update; only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goal: Option<FitnessGoal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_conditions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_equipment: Option<Vec<String>>,
}

/// A progress photo uploaded by a user
/// Maps to `user_photos` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPhoto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_url: String,
    pub photo_metadata: Option<Value>,
    pub analysis_results: Option<Value>,
    pub taken_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl_record!(UserPhoto, "user_photos", "user photo");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserPhoto {
    pub user_id: Uuid,
    pub photo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_metadata: Option<Value>,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_decodes_from_backend_row() {
        let row = json!({
            "id": "7f1f2a44-3c1e-4b8e-9d1b-8a6f0f3f9c01",
            "email": "ada@example.com",
            "full_name": "Ada",
            "avatar_url": null,
            "age": 36,
            "height_cm": 165.0,
            "weight_kg": null,
            "fitness_goal": "muscle_gain",
            "activity_level": "very_active",
            "medical_conditions": ["asthma"],
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-02T10:00:00Z"
        });

        let profile: UserProfile = serde_json::from_value(row).unwrap();
        assert_eq!(profile.fitness_goal, Some(FitnessGoal::MuscleGain));
        assert_eq!(profile.activity_level, Some(ActivityLevel::VeryActive));
        assert!(profile.available_equipment.is_empty());
    }

    #[test]
    fn update_serializes_only_set_fields() {
        let update = UpdateUserProfile {
            weight_kg: Some(70.5),
            fitness_goal: Some(FitnessGoal::WeightLoss),
            ..UpdateUserProfile::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"weight_kg": 70.5, "fitness_goal": "weight_loss"})
        );
    }
}
