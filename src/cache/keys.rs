//! Cache key namespace
//!
//! Keys are `namespace:owner[:qualifier]`. Every view owned by a user shares
//! the `user:<view>:<user_id>` stem, so one exact delete plus one
//! `<stem>:*` pattern delete removes every qualified variant of that view.
//! Matching `<stem>*` instead would also catch other owners whose id starts
//! with the same characters.

use std::fmt;

/// Deterministic key generators
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeys;

impl CacheKeys {
    pub fn user_profile(user_id: &str) -> String {
        format!("user:profile:{user_id}")
    }

    pub fn user_photos(user_id: &str) -> String {
        format!("user:photos:{user_id}")
    }

    pub fn workout_plans(user_id: &str) -> String {
        format!("user:workout_plans:{user_id}")
    }

    pub fn workout_plan(plan_id: &str) -> String {
        format!("workout_plan:{plan_id}")
    }

    pub fn workout_sessions(user_id: &str, limit: Option<u32>) -> String {
        with_qualifier(format!("user:workout_sessions:{user_id}"), limit)
    }

    pub fn nutrition_plans(user_id: &str) -> String {
        format!("user:nutrition_plans:{user_id}")
    }

    pub fn nutrition_plan(plan_id: &str) -> String {
        format!("nutrition_plan:{plan_id}")
    }

    pub fn nutrition_logs(user_id: &str, limit: Option<u32>) -> String {
        with_qualifier(format!("user:nutrition_logs:{user_id}"), limit)
    }

    pub fn progress_analytics(user_id: &str, metric: Option<&str>) -> String {
        with_qualifier(format!("user:progress:{user_id}"), metric)
    }

    pub fn exercises(category: Option<&str>) -> String {
        with_qualifier("exercises".to_string(), category)
    }

    pub fn meals(meal_type: Option<&str>) -> String {
        with_qualifier("meals".to_string(), meal_type)
    }

    pub fn user_activity_summary(user_id: &str) -> String {
        format!("user:activity_summary:{user_id}")
    }

    /// Every per-user view stem, unqualified
    pub fn user_views(user_id: &str) -> Vec<String> {
        vec![
            Self::user_profile(user_id),
            Self::user_photos(user_id),
            Self::workout_plans(user_id),
            Self::workout_sessions(user_id, None),
            Self::nutrition_plans(user_id),
            Self::nutrition_logs(user_id, None),
            Self::progress_analytics(user_id, None),
            Self::user_activity_summary(user_id),
        ]
    }
}

/// Qualifier trait for optional key suffixes; zero and empty mean "none"
trait Qualifier {
    fn segment(&self) -> Option<String>;
}

impl Qualifier for Option<u32> {
    fn segment(&self) -> Option<String> {
        self.filter(|limit| *limit > 0).map(|limit| limit.to_string())
    }
}

impl Qualifier for Option<&str> {
    fn segment(&self) -> Option<String> {
        self.filter(|value| !value.is_empty()).map(str::to_string)
    }
}

fn with_qualifier(stem: String, qualifier: impl Qualifier) -> String {
    match qualifier.segment() {
        Some(segment) => format!("{stem}:{segment}"),
        None => stem,
    }
}

/// Escape glob metacharacters so an id only ever matches itself
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Owning entity whose cached views can be invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Every per-user view of the owner
    User,
    /// The plan itself and every user's plan list
    WorkoutPlan,
    NutritionPlan,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::WorkoutPlan => "workout_plan",
            Self::NutritionPlan => "nutrition_plan",
        };
        f.write_str(name)
    }
}

/// A single delete the cache service performs during invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    Key(String),
    Pattern(String),
}

impl EntityKind {
    /// Keys and patterns covering every cached view owned by `owner_id`
    pub fn invalidation_targets(self, owner_id: &str) -> Vec<InvalidationTarget> {
        use InvalidationTarget::{Key, Pattern};

        let stem_and_variants = |stem: String| {
            let pattern = format!("{}:*", escape_glob(&stem));
            [Key(stem), Pattern(pattern)]
        };

        match self {
            Self::User => CacheKeys::user_views(owner_id)
                .into_iter()
                .flat_map(stem_and_variants)
                .collect(),
            Self::WorkoutPlan => vec![
                Key(CacheKeys::workout_plan(owner_id)),
                Pattern("user:workout_plans:*".to_string()),
            ],
            Self::NutritionPlan => vec![
                Key(CacheKeys::nutrition_plan(owner_id)),
                Pattern("user:nutrition_plans:*".to_string()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::providers::glob_match;

    #[test]
    fn keys_follow_namespace_layout() {
        assert_eq!(CacheKeys::user_profile("u1"), "user:profile:u1");
        assert_eq!(CacheKeys::workout_plan("p1"), "workout_plan:p1");
        assert_eq!(
            CacheKeys::workout_sessions("u1", Some(50)),
            "user:workout_sessions:u1:50"
        );
        assert_eq!(CacheKeys::workout_sessions("u1", None), "user:workout_sessions:u1");
        assert_eq!(CacheKeys::nutrition_logs("u1", Some(0)), "user:nutrition_logs:u1");
        assert_eq!(
            CacheKeys::progress_analytics("u1", Some("weight")),
            "user:progress:u1:weight"
        );
        assert_eq!(CacheKeys::exercises(Some("strength")), "exercises:strength");
        assert_eq!(CacheKeys::exercises(Some("")), "exercises");
        assert_eq!(CacheKeys::meals(None), "meals");
        assert_eq!(
            CacheKeys::user_activity_summary("u1"),
            "user:activity_summary:u1"
        );
    }

    fn covered(targets: &[InvalidationTarget], key: &str) -> bool {
        targets.iter().any(|target| match target {
            InvalidationTarget::Key(k) => k == key,
            InvalidationTarget::Pattern(p) => glob_match(p, key),
        })
    }

    #[test]
    fn user_invalidation_covers_every_view_of_that_user_only() {
        let targets = EntityKind::User.invalidation_targets("u1");

        for key in [
            CacheKeys::user_profile("u1"),
            CacheKeys::workout_sessions("u1", Some(50)),
            CacheKeys::nutrition_logs("u1", Some(10)),
            CacheKeys::progress_analytics("u1", Some("weight")),
            CacheKeys::user_activity_summary("u1"),
        ] {
            assert!(covered(&targets, &key), "{key} should be invalidated");
        }

        assert!(!covered(&targets, &CacheKeys::user_profile("u10")));
        assert!(!covered(&targets, &CacheKeys::workout_sessions("u10", Some(50))));
        assert!(!covered(&targets, &CacheKeys::exercises(None)));
    }

    #[test]
    fn plan_invalidation_covers_all_plan_lists() {
        let targets = EntityKind::WorkoutPlan.invalidation_targets("p1");
        assert!(covered(&targets, "workout_plan:p1"));
        assert!(covered(&targets, "user:workout_plans:u1"));
        assert!(covered(&targets, "user:workout_plans:u2"));
        assert!(!covered(&targets, "workout_plan:p2"));
        assert!(!covered(&targets, "user:nutrition_plans:u1"));
    }

    #[test]
    fn glob_metacharacters_in_ids_are_escaped() {
        assert_eq!(escape_glob("a*b?"), "a\\*b\\?");
        let targets = EntityKind::User.invalidation_targets("*");
        assert!(!covered(&targets, &CacheKeys::user_profile("u1")));
        assert!(covered(&targets, &CacheKeys::user_profile("*")));
    }
}
