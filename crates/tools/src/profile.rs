//! `getUserProfile` and `updateUserProfile`.
//!
//! Both act only for the caller's user id, which the dispatcher resolves
//! from the caller context before these run. Any `userId` the model puts
//! in the arguments is ignored.

use chrono::Utc;
use hydra_core::catalog::{ActivityLevel, Climate, UserProfile};
use hydra_core::error::ToolError;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ToolBackends, ToolName, backend_failure, parse_args, to_json};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdate {
    activity_level: Option<ActivityLevel>,
    climate: Option<Climate>,
    dietary_preference: Option<String>,
    hydration_goal: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.activity_level.is_none()
            && self.climate.is_none()
            && self.dietary_preference.is_none()
            && self.hydration_goal.is_none()
    }

    /// Merge into the existing profile, or build a new one.
    fn apply(self, user_id: &str, existing: Option<UserProfile>) -> Result<UserProfile, ToolError> {
        let dietary_preference = non_blank(self.dietary_preference);
        let hydration_goal = non_blank(self.hydration_goal);

        match existing {
            Some(mut profile) => {
                if let Some(level) = self.activity_level {
                    profile.activity_level = level;
                }
                if let Some(climate) = self.climate {
                    profile.climate = climate;
                }
                if dietary_preference.is_some() {
                    profile.dietary_preference = dietary_preference;
                }
                if hydration_goal.is_some() {
                    profile.hydration_goal = hydration_goal;
                }
                profile.updated_at = Utc::now();
                Ok(profile)
            }
            None => {
                let (Some(activity_level), Some(climate)) = (self.activity_level, self.climate) else {
                    return Err(ToolError::InvalidArguments(
                        "activityLevel and climate are required when creating a profile".into(),
                    ));
                };
                Ok(UserProfile {
                    user_id: user_id.to_string(),
                    activity_level,
                    climate,
                    dietary_preference,
                    hydration_goal,
                    updated_at: Utc::now(),
                })
            }
        }
    }
}

pub(crate) async fn get_user_profile(backends: &ToolBackends, user_id: &str) -> Result<Value, ToolError> {
    let tool = ToolName::GetUserProfile;
    let profile = backends
        .profiles
        .get_profile(user_id)
        .await
        .map_err(|e| backend_failure(tool, e))?;

    match profile {
        Some(profile) => to_json(tool, &profile),
        None => Ok(json!({
            "profile": null,
            "reason": "profile_not_set_up",
            "message": "User is logged in but has not set up their hydration profile yet. They can add activity level, climate, and goals on the Profile page. General product recommendations via searchProducts still work."
        })),
    }
}

pub(crate) async fn update_user_profile(backends: &ToolBackends, user_id: &str, args: Value) -> Result<Value, ToolError> {
    let tool = ToolName::UpdateUserProfile;
    let update: ProfileUpdate = parse_args(args)?;
    if update.is_empty() {
        return Err(ToolError::InvalidArguments(
            "provide at least one of activityLevel, climate, dietaryPreference, hydrationGoal".into(),
        ));
    }

    let existing = backends
        .profiles
        .get_profile(user_id)
        .await
        .map_err(|e| backend_failure(tool, e))?;
    let profile = update.apply(user_id, existing)?;

    let saved = backends
        .profiles
        .upsert_profile(profile)
        .await
        .map_err(|e| backend_failure(tool, e))?;
    to_json(tool, &saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing() -> UserProfile {
        UserProfile {
            user_id: "u1".into(),
            activity_level: ActivityLevel::Sedentary,
            climate: Climate::Temperate,
            dietary_preference: Some("vegetarian".into()),
            hydration_goal: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn partial_update_merges() {
        let update = ProfileUpdate { climate: Some(Climate::Humid), ..Default::default() };
        let merged = update.apply("u1", Some(existing())).unwrap();
        assert_eq!(merged.climate, Climate::Humid);
        assert_eq!(merged.activity_level, ActivityLevel::Sedentary);
        assert_eq!(merged.dietary_preference.as_deref(), Some("vegetarian"));
    }

    #[test]
    fn create_requires_activity_and_climate() {
        let update = ProfileUpdate { climate: Some(Climate::Dry), ..Default::default() };
        assert!(matches!(update.apply("u1", None), Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn model_supplied_user_id_is_ignored_by_parsing() {
        let update: ProfileUpdate = parse_args(json!({
            "userId": "someone-else",
            "activityLevel": "active",
            "climate": "dry"
        }))
        .unwrap();
        let created = update.apply("caller", None).unwrap();
        assert_eq!(created.user_id, "caller");
    }

    #[test]
    fn unknown_enum_value_is_invalid() {
        let parsed: Result<ProfileUpdate, _> = parse_args(json!({"climate": "arctic"}));
        assert!(matches!(parsed, Err(ToolError::InvalidArguments(_))));
    }
}
