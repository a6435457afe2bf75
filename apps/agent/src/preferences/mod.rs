// Profile preferences: normalization of free-text values and persistence
// into user_profile_items.

pub mod completeness;
pub mod handlers;
pub mod normalize;
pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::preferences::normalize::normalize;
use crate::preferences::store::{save_preference, ProfileStore, SaveOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Location,
    RolePreference,
    Skill,
    Company,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Location => "location",
            ItemType::RolePreference => "role_preference",
            ItemType::Skill => "skill",
            ItemType::Company => "company",
        }
    }

    /// Single-value types keep at most one row per user; a new value replaces the old one.
    pub fn is_single_value(&self) -> bool {
        matches!(self, ItemType::Location | ItemType::RolePreference)
    }

    /// Parses a stored `item_type` column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "location" => Some(ItemType::Location),
            "role_preference" => Some(ItemType::RolePreference),
            "skill" => Some(ItemType::Skill),
            "company" => Some(ItemType::Company),
            _ => None,
        }
    }

    /// Maps the caller-facing preference name (as the model or the widget
    /// sends it) to the stored item type.
    pub fn from_preference_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "location" => Some(ItemType::Location),
            "role" | "role_preference" => Some(ItemType::RolePreference),
            "skill" | "skills" | "experience" => Some(ItemType::Skill),
            "company" | "companies" => Some(ItemType::Company),
            _ => None,
        }
    }
}

/// Metadata `source` for values picked up in conversation.
pub const SOURCE_CONVERSATION: &str = "voice_detected";
/// Metadata `source` for values sent through the profile API.
pub const SOURCE_PROFILE_API: &str = "profile_api";

/// Normalizes and saves one preference for a logged-in user.
/// Never fails: rejections and storage errors come back inside the outcome.
pub async fn save_user_preference(
    store: &dyn ProfileStore,
    user_id: &str,
    preference_type: &str,
    raw_value: &str,
    source: &str,
) -> SaveOutcome {
    let Some(item_type) = ItemType::from_preference_name(preference_type) else {
        warn!("Unsupported preference type: {preference_type}");
        return SaveOutcome::failed(format!(
            "Unsupported preference type '{preference_type}'. Use location, role_preference, skill or company."
        ));
    };

    let normalized = match normalize(raw_value, item_type) {
        Ok(n) => n,
        Err(e) => {
            info!("Rejected {} value '{raw_value}': {e}", item_type.as_str());
            return SaveOutcome::failed(e.to_string());
        }
    };

    let metadata = json!({ "source": source, "match": normalized.matched });
    save_preference(store, user_id, item_type, &normalized.value, &metadata).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::store::InMemoryProfileStore;

    #[test]
    fn test_preference_name_mapping() {
        assert_eq!(
            ItemType::from_preference_name("role"),
            Some(ItemType::RolePreference)
        );
        assert_eq!(
            ItemType::from_preference_name("Experience"),
            Some(ItemType::Skill)
        );
        assert_eq!(ItemType::from_preference_name("salary"), None);
    }

    #[test]
    fn test_single_value_types() {
        assert!(ItemType::Location.is_single_value());
        assert!(ItemType::RolePreference.is_single_value());
        assert!(!ItemType::Skill.is_single_value());
        assert!(!ItemType::Company.is_single_value());
    }

    #[tokio::test]
    async fn test_save_user_preference_normalizes_before_saving() {
        let store = InMemoryProfileStore::default();
        let outcome = save_user_preference(&store, "u1", "role", " cto ", SOURCE_CONVERSATION).await;
        assert!(outcome.saved);
        assert_eq!(outcome.value.as_deref(), Some("CTO"));
        assert_eq!(store.values("u1", "role_preference"), vec!["CTO"]);
    }

    #[tokio::test]
    async fn test_save_user_preference_rejection_is_structured() {
        let store = InMemoryProfileStore::default();
        let outcome = save_user_preference(&store, "u1", "location", "7", SOURCE_CONVERSATION).await;
        assert!(!outcome.saved);
        assert!(outcome.error.unwrap().contains("valid location"));
        assert!(store.values("u1", "location").is_empty());
    }

    #[tokio::test]
    async fn test_save_user_preference_unknown_type() {
        let store = InMemoryProfileStore::default();
        let outcome = save_user_preference(&store, "u1", "salary", "100k", SOURCE_CONVERSATION).await;
        assert!(!outcome.saved);
        assert!(outcome.error.is_some());
    }
}
