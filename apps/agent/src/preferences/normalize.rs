//! Maps free-text location, role and skill answers onto the stored values.
//!
//! Matching is plain string containment against small fixed lists, not
//! semantic similarity:
//! - exact case-insensitive match first,
//! - then substring in either direction,
//! - first entry in list order wins; there is no scoring.
//!
//! Unknown values are accepted as "custom" when they are at least two
//! characters long and contain a letter. That guard is deliberately weak
//! (`"xx"` passes); tightening it would change accepted input.

use serde::Serialize;
use thiserror::Error;

use crate::preferences::ItemType;

pub const KNOWN_LOCATIONS: &[&str] = &[
    "London",
    "Manchester",
    "Birmingham",
    "Leeds",
    "Glasgow",
    "Liverpool",
    "Edinburgh",
    "Bristol",
    "Sheffield",
    "Newcastle",
    "Nottingham",
    "Cardiff",
    "Belfast",
    "Leicester",
    "Southampton",
    "Brighton",
    "Oxford",
    "Cambridge",
    "Reading",
    "Milton Keynes",
    "Remote",
    "Hybrid",
];

pub const KNOWN_ROLES: &[&str] = &[
    "CEO",
    "CFO",
    "CMO",
    "CTO",
    "COO",
    "CHRO",
    "CIO",
    "CISO",
    "CPO",
    "CRO",
    "VP ENGINEERING",
    "VP SALES",
    "VP MARKETING",
    "VP OPERATIONS",
    "VP PRODUCT",
    "DIRECTOR",
    "MANAGING DIRECTOR",
    "GENERAL MANAGER",
    "BOARD MEMBER",
    "NON-EXECUTIVE DIRECTOR",
    "ADVISOR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Equal to a list entry, ignoring case.
    Exact,
    /// Contains, or is contained in, a list entry.
    Partial,
    /// Not in the list but passed the length/letter guard.
    Custom,
    /// Open-vocabulary type; no list to match against.
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: String,
    pub matched: MatchKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("'{0}' doesn't look like a valid location.")]
    InvalidLocation(String),

    #[error("'{0}' doesn't look like a valid job title. Try: CEO, CFO, CMO, CTO, etc.")]
    InvalidRole(String),

    #[error("{0} value cannot be empty")]
    Empty(&'static str),
}

pub fn normalize(raw: &str, item_type: ItemType) -> Result<Normalized, NormalizeError> {
    match item_type {
        ItemType::Location => normalize_location(raw),
        ItemType::RolePreference => normalize_role(raw),
        ItemType::Skill => open_value(title_case(raw.trim()), "skill"),
        ItemType::Company => open_value(raw.trim().to_string(), "company"),
    }
}

fn normalize_location(raw: &str) -> Result<Normalized, NormalizeError> {
    let value = title_case(raw.trim());
    if value.is_empty() {
        return Err(NormalizeError::InvalidLocation(raw.to_string()));
    }
    let lower = value.to_lowercase();

    if let Some(known) = KNOWN_LOCATIONS
        .iter()
        .find(|loc| loc.to_lowercase() == lower)
    {
        return Ok(matched(known, MatchKind::Exact));
    }

    if let Some(known) = KNOWN_LOCATIONS.iter().find(|loc| {
        let loc = loc.to_lowercase();
        loc.contains(&lower) || lower.contains(&loc)
    }) {
        return Ok(matched(known, MatchKind::Partial));
    }

    if !passes_custom_guard(&value) {
        return Err(NormalizeError::InvalidLocation(raw.to_string()));
    }
    Ok(Normalized {
        value,
        matched: MatchKind::Custom,
    })
}

fn normalize_role(raw: &str) -> Result<Normalized, NormalizeError> {
    let value = raw.trim().to_uppercase();
    if value.is_empty() {
        return Err(NormalizeError::InvalidRole(raw.to_string()));
    }

    if let Some(known) = KNOWN_ROLES.iter().find(|role| **role == value) {
        return Ok(matched(known, MatchKind::Exact));
    }

    if let Some(known) = KNOWN_ROLES
        .iter()
        .find(|role| role.contains(value.as_str()) || value.contains(**role))
    {
        return Ok(matched(known, MatchKind::Partial));
    }

    let compact = strip_whitespace(&value);
    if let Some(known) = KNOWN_ROLES
        .iter()
        .find(|role| strip_whitespace(role) == compact)
    {
        return Ok(matched(known, MatchKind::Partial));
    }

    if !passes_custom_guard(&value) {
        return Err(NormalizeError::InvalidRole(raw.to_string()));
    }
    Ok(Normalized {
        value,
        matched: MatchKind::Custom,
    })
}

fn open_value(value: String, field: &'static str) -> Result<Normalized, NormalizeError> {
    if value.is_empty() {
        return Err(NormalizeError::Empty(field));
    }
    Ok(Normalized {
        value,
        matched: MatchKind::Open,
    })
}

fn matched(known: &str, kind: MatchKind) -> Normalized {
    Normalized {
        value: known.to_string(),
        matched: kind,
    }
}

fn passes_custom_guard(value: &str) -> bool {
    value.chars().count() >= 2 && value.chars().any(char::is_alphabetic)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Upper-cases the first letter of every run of letters and lower-cases the
/// rest: `"milton keynes"` → `"Milton Keynes"`, `"o'neil"` → `"O'Neil"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(raw: &str) -> Result<Normalized, NormalizeError> {
        normalize(raw, ItemType::Location)
    }

    fn role(raw: &str) -> Result<Normalized, NormalizeError> {
        normalize(raw, ItemType::RolePreference)
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("milton keynes"), "Milton Keynes");
        assert_eq!(title_case("LONDON"), "London");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("3d modelling"), "3D Modelling");
    }

    #[test]
    fn test_location_exact() {
        let n = loc("manchester").unwrap();
        assert_eq!(n.value, "Manchester");
        assert_eq!(n.matched, MatchKind::Exact);
        assert_eq!(loc("  MILTON keynes ").unwrap().value, "Milton Keynes");
    }

    #[test]
    fn test_location_partial_either_direction() {
        let n = loc("I'm in manchester").unwrap();
        assert_eq!(n.value, "Manchester");
        assert_eq!(n.matched, MatchKind::Partial);
        assert_eq!(loc("remote work").unwrap().value, "Remote");
        assert_eq!(loc("milton").unwrap().value, "Milton Keynes");
    }

    #[test]
    fn test_location_first_entry_wins() {
        // both London and Leeds appear; London comes first in the list
        assert_eq!(loc("leeds or london").unwrap().value, "London");
    }

    #[test]
    fn test_location_custom_accepted() {
        let n = loc("new york").unwrap();
        assert_eq!(n.value, "New York");
        assert_eq!(n.matched, MatchKind::Custom);
    }

    #[test]
    fn test_location_weak_guard_accepts_two_letters() {
        let n = loc("xx").unwrap();
        assert_eq!(n.value, "Xx");
        assert_eq!(n.matched, MatchKind::Custom);
    }

    #[test]
    fn test_location_rejections() {
        assert!(matches!(loc(""), Err(NormalizeError::InvalidLocation(_))));
        assert!(matches!(loc("   "), Err(NormalizeError::InvalidLocation(_))));
        assert!(matches!(loc("7"), Err(NormalizeError::InvalidLocation(_))));
        assert!(matches!(loc("42"), Err(NormalizeError::InvalidLocation(_))));
    }

    #[test]
    fn test_role_exact() {
        let n = role("cto").unwrap();
        assert_eq!(n.value, "CTO");
        assert_eq!(n.matched, MatchKind::Exact);
        assert_eq!(role("non-executive director").unwrap().value, "NON-EXECUTIVE DIRECTOR");
    }

    #[test]
    fn test_role_partial() {
        assert_eq!(role("fractional cfo").unwrap().value, "CFO");
        assert_eq!(role("board").unwrap().value, "BOARD MEMBER");
        assert_eq!(role("vp").unwrap().value, "VP ENGINEERING");
    }

    #[test]
    fn test_role_containment_is_not_semantic() {
        // "DIRECTOR" contains "CTO", and CTO is listed first
        assert_eq!(role("director of ops").unwrap().value, "CTO");
    }

    #[test]
    fn test_role_whitespace_insensitive() {
        let n = role("vpsales").unwrap();
        assert_eq!(n.value, "VP SALES");
        assert_eq!(n.matched, MatchKind::Partial);
    }

    #[test]
    fn test_role_custom_and_rejections() {
        let n = role("chief of staff").unwrap();
        assert_eq!(n.value, "CHIEF OF STAFF");
        assert_eq!(n.matched, MatchKind::Custom);
        assert!(matches!(role(""), Err(NormalizeError::InvalidRole(_))));
        assert!(matches!(role("7"), Err(NormalizeError::InvalidRole(_))));
    }

    #[test]
    fn test_role_rejection_message() {
        let err = role("9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'9' doesn't look like a valid job title. Try: CEO, CFO, CMO, CTO, etc."
        );
    }

    #[test]
    fn test_skill_open_vocabulary() {
        let n = normalize(" rust programming ", ItemType::Skill).unwrap();
        assert_eq!(n.value, "Rust Programming");
        assert_eq!(n.matched, MatchKind::Open);
        assert_eq!(
            normalize("  ", ItemType::Skill),
            Err(NormalizeError::Empty("skill"))
        );
    }

    #[test]
    fn test_company_kept_verbatim() {
        assert_eq!(
            normalize(" McKinsey & Co ", ItemType::Company).unwrap().value,
            "McKinsey & Co"
        );
    }
}
