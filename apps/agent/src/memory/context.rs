//! What the assistant remembers about a user, checked against onboarding.
//!
//! Fetches remembered facts for a user and classifies them against the
//! onboarding checklist (location, role preference, experience). Evaluated
//! fresh on every request; nothing is persisted.
//!
//! Any failure (no user, no service, error status, zero facts) fails open to
//! "everything missing", so the assistant asks rather than assumes.

use serde::Serialize;
use tracing::{info, warn};

use crate::memory::MemoryService;

pub const CHECKLIST_QUERY: &str = "user preferences interests roles locations experience";
const FACT_LIMIT: usize = 10;
const REMEMBERED_LIMIT: usize = 5;

const LOCATION_TERMS: &[&str] = &[
    "london",
    "manchester",
    "birmingham",
    "remote",
    "uk",
    "location",
    "based in",
    "lives in",
];
const ROLE_TERMS: &[&str] = &[
    "cto",
    "cfo",
    "cmo",
    "coo",
    "chro",
    "cpo",
    "cro",
    "executive",
    "role",
    "interested in",
];
const EXPERIENCE_TERMS: &[&str] = &["experience", "years", "worked at", "background", "skills"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Location,
    RolePreference,
    Experience,
}

impl ProfileField {
    /// Checklist in the order questions are asked.
    pub const ALL: [ProfileField; 3] = [
        ProfileField::Location,
        ProfileField::RolePreference,
        ProfileField::Experience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Location => "location",
            ProfileField::RolePreference => "role_preference",
            ProfileField::Experience => "experience",
        }
    }

    fn terms(&self) -> &'static [&'static str] {
        match self {
            ProfileField::Location => LOCATION_TERMS,
            ProfileField::RolePreference => ROLE_TERMS,
            ProfileField::Experience => EXPERIENCE_TERMS,
        }
    }
}

/// Where a user stands in onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum OnboardingStage {
    /// No remembered facts at all.
    New,
    /// Some facts; ask about `next`.
    Partial { next: ProfileField },
    Complete,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemoryContext {
    pub facts: Vec<String>,
    /// Rendered "What I remember about you" block; empty when there are no facts.
    pub facts_text: String,
    pub complete: bool,
    pub missing: Vec<ProfileField>,
}

impl MemoryContext {
    pub fn empty() -> Self {
        MemoryContext {
            facts: Vec::new(),
            facts_text: String::new(),
            complete: false,
            missing: ProfileField::ALL.to_vec(),
        }
    }

    pub fn from_facts(facts: Vec<String>) -> Self {
        if facts.is_empty() {
            return Self::empty();
        }
        let missing = missing_fields(&facts);
        MemoryContext {
            facts_text: render_remembered(&facts),
            complete: missing.is_empty(),
            missing,
            facts,
        }
    }

    pub fn stage(&self) -> OnboardingStage {
        if self.facts.is_empty() {
            return OnboardingStage::New;
        }
        match self.missing.first() {
            Some(next) => OnboardingStage::Partial { next: *next },
            None => OnboardingStage::Complete,
        }
    }
}

/// A field is present when any of its terms appears anywhere in the
/// concatenated, lower-cased facts. No per-fact attribution.
pub fn missing_fields(facts: &[String]) -> Vec<ProfileField> {
    let text = facts.join(" ").to_lowercase();
    ProfileField::ALL
        .into_iter()
        .filter(|field| !field.terms().iter().any(|term| text.contains(term)))
        .collect()
}

fn render_remembered(facts: &[String]) -> String {
    let lines: Vec<String> = facts
        .iter()
        .take(REMEMBERED_LIMIT)
        .map(|f| format!("- {f}"))
        .collect();
    format!("\n\n## What I remember about you:\n{}", lines.join("\n"))
}

pub async fn build_context(
    memory: Option<&dyn MemoryService>,
    user_id: Option<&str>,
) -> MemoryContext {
    let (Some(memory), Some(user_id)) = (memory, user_id) else {
        return MemoryContext::empty();
    };

    let edges = match memory
        .search_facts(user_id, CHECKLIST_QUERY, FACT_LIMIT)
        .await
    {
        Ok(edges) => edges,
        Err(e) => {
            warn!("Memory search failed for user {user_id}: {e}");
            return MemoryContext::empty();
        }
    };

    let facts: Vec<String> = edges
        .into_iter()
        .take(FACT_LIMIT)
        .filter_map(|e| e.fact)
        .filter(|f| !f.trim().is_empty())
        .collect();

    let ctx = MemoryContext::from_facts(facts);
    if !ctx.facts.is_empty() {
        info!(
            "Found {} facts for user {user_id}, complete={}",
            ctx.facts.len(),
            ctx.complete
        );
    }
    ctx
}
