// Pulls short graph labels out of verbose memory facts, e.g.
// "Jane has 12 years in fintech as a CFO" -> CFO (role), Fintech (interest),
// 12+ Years (skill).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::preferences::normalize::title_case;
use crate::text::contains_term;

const LOCATIONS: &[&str] = &[
    "london",
    "manchester",
    "birmingham",
    "leeds",
    "bristol",
    "edinburgh",
    "glasgow",
    "remote",
    "uk",
    "europe",
    "usa",
    "new york",
    "san francisco",
    "sydney",
    "dublin",
];
const ROLES: &[&str] = &[
    "cto", "cfo", "cmo", "coo", "cpo", "chro", "ciso", "ceo", "vp", "director", "head of",
    "chief", "founder", "partner",
];
const INDUSTRIES: &[&str] = &[
    "tech",
    "fintech",
    "saas",
    "ai",
    "finance",
    "healthcare",
    "retail",
    "ecommerce",
    "media",
    "consulting",
    "startup",
    "enterprise",
    "pharma",
];
const SKILLS: &[&str] = &[
    "python",
    "javascript",
    "react",
    "node",
    "aws",
    "cloud",
    "data",
    "analytics",
    "strategy",
    "leadership",
    "product",
    "marketing",
    "sales",
    "growth",
    "m&a",
    "fundraising",
];

const UPPERCASE_LABELS: &[&str] = &[
    "uk", "usa", "cto", "cfo", "cmo", "coo", "cpo", "chro", "ciso", "ceo", "vp", "ai", "saas",
    "aws", "m&a",
];

static YEARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:\+\s*)?years?").expect("valid years pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Location,
    Role,
    Interest,
    Skill,
}

impl EntityKind {
    /// Node type used by the interest graph.
    pub fn node_type(&self) -> &'static str {
        match self {
            EntityKind::Location => "location",
            EntityKind::Role => "role",
            EntityKind::Interest => "interest",
            EntityKind::Skill => "skill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub label: String,
    pub kind: EntityKind,
}

fn label_for(term: &str) -> String {
    if UPPERCASE_LABELS.contains(&term) {
        term.to_uppercase()
    } else {
        title_case(term)
    }
}

/// Terms match on word boundaries, so "ai" does not fire inside "said".
pub fn extract_entities(fact: &str) -> Vec<Entity> {
    let lower = fact.to_lowercase();
    let groups: [(&[&str], EntityKind); 4] = [
        (LOCATIONS, EntityKind::Location),
        (ROLES, EntityKind::Role),
        (INDUSTRIES, EntityKind::Interest),
        (SKILLS, EntityKind::Skill),
    ];

    let mut entities: Vec<Entity> = groups
        .iter()
        .flat_map(|(terms, kind)| {
            terms
                .iter()
                .filter(|term| contains_term(&lower, term))
                .map(move |term| Entity {
                    label: label_for(term),
                    kind: *kind,
                })
        })
        .collect();

    if let Some(caps) = YEARS_RE.captures(&lower) {
        entities.push(Entity {
            label: format!("{}+ Years", &caps[1]),
            kind: EntityKind::Skill,
        });
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(fact: &str) -> Vec<(String, EntityKind)> {
        extract_entities(fact)
            .into_iter()
            .map(|e| (e.label, e.kind))
            .collect()
    }

    #[test]
    fn test_extracts_each_kind() {
        let found = labels("Jane has 12 years in fintech as a CFO in London");
        assert!(found.contains(&("London".into(), EntityKind::Location)));
        assert!(found.contains(&("CFO".into(), EntityKind::Role)));
        assert!(found.contains(&("Fintech".into(), EntityKind::Interest)));
        assert!(found.contains(&("12+ Years".into(), EntityKind::Skill)));
    }

    #[test]
    fn test_multi_word_terms_are_title_cased() {
        let found = labels("Moved to new york to become head of product");
        assert!(found.contains(&("New York".into(), EntityKind::Location)));
        assert!(found.contains(&("Head Of".into(), EntityKind::Role)));
        assert!(found.contains(&("Product".into(), EntityKind::Skill)));
    }

    #[test]
    fn test_terms_need_word_boundaries() {
        assert!(labels("She said the chair was comfy").is_empty());
    }

    #[test]
    fn test_plus_years_variant() {
        let found = labels("Has 20+ years leading teams");
        assert_eq!(found, vec![("20+ Years".to_string(), EntityKind::Skill)]);
    }

    #[test]
    fn test_acronyms_stay_uppercase() {
        let found = labels("Led M&A at a SaaS company on AWS");
        assert!(found.contains(&("M&A".into(), EntityKind::Skill)));
        assert!(found.contains(&("SAAS".into(), EntityKind::Interest)));
        assert!(found.contains(&("AWS".into(), EntityKind::Skill)));
    }
}
