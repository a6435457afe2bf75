// Job board queries: keyword search for the chat and aggregate widgets.
// Reads the `jobs` table owned by the website; nothing here writes to it.

pub mod insights;
pub mod search;

use serde::{Deserialize, Serialize};

pub use search::{parse_search_query, search_jobs, SearchResults};

/// Compact job reference kept in the request state for "that job" follow-ups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
