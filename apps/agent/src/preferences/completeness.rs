use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileItemRow;

/// Completeness of the stored profile (as opposed to the memory-derived
/// onboarding checklist in `memory::context`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredCompleteness {
    pub complete: bool,
    pub percent: u32,
    pub skills_count: usize,
    pub has_location: bool,
    pub has_role: bool,
    pub missing: Vec<String>,
}

const TRACKED_FIELDS: &[(&str, &str)] = &[
    ("skills", "skill"),
    ("location", "location"),
    ("role", "role_preference"),
];

pub fn compute_stored_completeness(items: &[ProfileItemRow]) -> StoredCompleteness {
    let counts = count_by_type(items);
    let count_of = |item_type: &str| counts.get(item_type).copied().unwrap_or(0);

    let missing: Vec<String> = TRACKED_FIELDS
        .iter()
        .filter(|(_, item_type)| count_of(item_type) == 0)
        .map(|(label, _)| label.to_string())
        .collect();

    let completed = TRACKED_FIELDS.len() - missing.len();
    let percent = (completed * 100 / TRACKED_FIELDS.len()) as u32;

    StoredCompleteness {
        complete: missing.is_empty(),
        percent,
        skills_count: count_of("skill"),
        has_location: count_of("location") > 0,
        has_role: count_of("role_preference") > 0,
        missing,
    }
}

fn count_by_type(items: &[ProfileItemRow]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.item_type.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(item_type: &str, value: &str) -> ProfileItemRow {
        ProfileItemRow {
            id: 1,
            user_id: "u".to_string(),
            item_type: item_type.to_string(),
            value: value.to_string(),
            metadata: None,
            confirmed: Some(false),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_profile() {
        let c = compute_stored_completeness(&[]);
        assert!(!c.complete);
        assert_eq!(c.percent, 0);
        assert_eq!(c.missing, vec!["skills", "location", "role"]);
    }

    #[test]
    fn test_partial_profile() {
        let items = vec![item("location", "London"), item("skill", "Python")];
        let c = compute_stored_completeness(&items);
        assert_eq!(c.percent, 66);
        assert_eq!(c.missing, vec!["role"]);
        assert!(c.has_location);
        assert!(!c.has_role);
    }

    #[test]
    fn test_complete_profile() {
        let items = vec![
            item("location", "London"),
            item("role_preference", "CTO"),
            item("skill", "Python"),
            item("skill", "Strategy"),
        ];
        let c = compute_stored_completeness(&items);
        assert!(c.complete);
        assert_eq!(c.percent, 100);
        assert_eq!(c.skills_count, 2);
    }
}
