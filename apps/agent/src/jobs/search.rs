use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use crate::jobs::JobSummary;
use crate::models::job::JobRow;
use crate::text::{contains_term, truncate_chars};

pub const DEFAULT_LIMIT: i64 = 10;
const DESCRIPTION_PREVIEW: usize = 150;

static LIMIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d+)\s*(most recent|jobs|roles|positions)?").expect("valid limit pattern")
});

const ROLE_KEYWORDS: &[&str] = &["cto", "cfo", "cmo", "coo", "chro", "cpo", "cro", "ciso", "cio"];
const LOCATION_KEYWORDS: &[&str] = &[
    "london",
    "manchester",
    "birmingham",
    "remote",
    "bristol",
    "leeds",
    "edinburgh",
];
const STOP_WORDS: &[&str] = &[
    "the",
    "and",
    "for",
    "all",
    "jobs",
    "show",
    "find",
    "positions",
    "roles",
    "fractional",
    "most",
    "recent",
];
/// Roles with a dedicated landing page on the job board.
const ROLE_PAGES: &[&str] = &["cto", "cfo", "cmo", "coo", "chro", "cpo", "cro"];
const BOARD_URL: &str = "https://fractional.quest";

/// Filters extracted from a free-text job query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub limit: i64,
    /// Upper-cased role keyword, e.g. `CTO`.
    pub role: Option<String>,
    /// Lower-cased location keyword.
    pub location: Option<String>,
    /// Free keyword, only used when neither role nor location was found.
    pub keyword: Option<String>,
}

pub fn parse_search_query(query: &str, page_location: Option<&str>) -> SearchPlan {
    let lower = query.to_lowercase();

    let limit = LIMIT_RE
        .captures(&lower)
        .and_then(|c| c[1].parse::<i64>().ok())
        .filter(|n| (1..=DEFAULT_LIMIT).contains(n))
        .unwrap_or(DEFAULT_LIMIT);

    let role = ROLE_KEYWORDS
        .iter()
        .find(|r| contains_term(&lower, r))
        .map(|r| r.to_uppercase());

    let location = LOCATION_KEYWORDS
        .iter()
        .find(|l| contains_term(&lower, l))
        .map(|l| l.to_string())
        .or_else(|| {
            page_location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_lowercase)
        });

    let keyword = if role.is_none() && location.is_none() {
        lower
            .split_whitespace()
            .find(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
            .map(str::to_string)
    } else {
        None
    };

    SearchPlan {
        limit,
        role,
        location,
        keyword,
    }
}

/// Newest jobs matching the plan. Each filter is skipped when its bind is NULL.
pub async fn search_jobs(pool: &PgPool, plan: &SearchPlan) -> Result<Vec<JobRow>, sqlx::Error> {
    let pattern = |s: &Option<String>| s.as_ref().map(|v| format!("%{v}%"));

    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, title, company, location, salary_min, salary_max, description, role_type
        FROM jobs
        WHERE ($1::TEXT IS NULL OR title ILIKE $1 OR role_type ILIKE $1)
          AND ($2::TEXT IS NULL OR location ILIKE $2)
          AND ($3::TEXT IS NULL OR title ILIKE $3 OR company ILIKE $3 OR description ILIKE $3)
        ORDER BY id DESC
        LIMIT $4
        "#,
    )
    .bind(pattern(&plan.role))
    .bind(pattern(&plan.location))
    .bind(pattern(&plan.keyword))
    .bind(plan.limit)
    .fetch_all(pool)
    .await?;

    info!(
        "Job search role={:?} location={:?} keyword={:?} limit={} -> {} rows",
        plan.role,
        plan.location,
        plan.keyword,
        plan.limit,
        rows.len()
    );
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobCard {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub url: String,
    pub role_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub jobs: Vec<JobCard>,
    pub total: usize,
    pub query: String,
    pub title: String,
}

impl SearchResults {
    pub fn new(query: &str, plan: &SearchPlan, rows: &[JobRow]) -> Self {
        let url = role_page_url(plan.role.as_deref());
        let jobs: Vec<JobCard> = rows.iter().map(|r| JobCard::from_row(r, &url)).collect();
        SearchResults {
            total: jobs.len(),
            title: format!("Found {} {query} positions", jobs.len()),
            query: query.to_string(),
            jobs,
        }
    }
}

impl JobCard {
    fn from_row(row: &JobRow, url: &str) -> Self {
        JobCard {
            title: row.title.clone(),
            company: row.company.clone().unwrap_or_else(|| "Unknown".to_string()),
            location: row.location.clone().unwrap_or_else(|| "Remote".to_string()),
            salary: salary_text(row.salary_min, row.salary_max),
            description: row
                .description
                .as_deref()
                .map(|d| truncate_chars(d, DESCRIPTION_PREVIEW))
                .unwrap_or_default(),
            url: url.to_string(),
            role_type: row.role_type.clone(),
        }
    }
}

impl From<&JobRow> for JobSummary {
    fn from(row: &JobRow) -> Self {
        JobSummary {
            title: row.title.clone(),
            company: row.company.clone().unwrap_or_else(|| "Unknown".to_string()),
            location: row.location.clone().unwrap_or_else(|| "Remote".to_string()),
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            description: row.description.clone(),
        }
    }
}

/// `£120k - £180k`, or `Competitive` unless both bounds are set and non-zero.
pub fn salary_text(min: Option<i32>, max: Option<i32>) -> String {
    match (min, max) {
        (Some(min), Some(max)) if min != 0 && max != 0 => {
            format!("£{}k - £{}k", min / 1000, max / 1000)
        }
        _ => "Competitive".to_string(),
    }
}

pub fn role_page_url(role: Option<&str>) -> String {
    match role.map(str::to_lowercase) {
        Some(r) if ROLE_PAGES.contains(&r.as_str()) => {
            format!("{BOARD_URL}/fractional-{r}-jobs-uk")
        }
        _ => format!("{BOARD_URL}/fractional-jobs"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(description: Option<&str>) -> JobRow {
        JobRow {
            id: 7,
            title: "Fractional CTO".into(),
            company: None,
            location: Some("London".into()),
            salary_min: Some(120_000),
            salary_max: Some(180_500),
            description: description.map(str::to_string),
            role_type: Some("CTO".into()),
        }
    }

    #[test]
    fn test_parse_role_location_and_limit() {
        let plan = parse_search_query("Show me 3 CTO jobs in London", None);
        assert_eq!(plan.limit, 3);
        assert_eq!(plan.role.as_deref(), Some("CTO"));
        assert_eq!(plan.location.as_deref(), Some("london"));
        assert_eq!(plan.keyword, None);
    }

    #[test]
    fn test_limit_out_of_range_uses_default() {
        assert_eq!(parse_search_query("50 jobs", None).limit, 10);
        assert_eq!(parse_search_query("0 roles", None).limit, 10);
        assert_eq!(parse_search_query("2 most recent", None).limit, 2);
        assert_eq!(parse_search_query("cfo roles", None).limit, 10);
    }

    #[test]
    fn test_page_location_fallback() {
        let plan = parse_search_query("cfo roles", Some("Manchester"));
        assert_eq!(plan.location.as_deref(), Some("manchester"));

        let plan = parse_search_query("cfo roles in leeds", Some("Manchester"));
        assert_eq!(plan.location.as_deref(), Some("leeds"));

        let plan = parse_search_query("cfo roles", Some("  "));
        assert_eq!(plan.location, None);
    }

    #[test]
    fn test_keyword_fallback_skips_stop_words() {
        let plan = parse_search_query("find all fintech positions", None);
        assert_eq!(plan.keyword.as_deref(), Some("fintech"));

        let plan = parse_search_query("show me jobs", None);
        assert_eq!(plan.keyword, None);
    }

    #[test]
    fn test_role_needs_whole_word() {
        let plan = parse_search_query("director roles", None);
        assert_eq!(plan.role, None);
        assert_eq!(plan.keyword.as_deref(), Some("director"));
    }

    #[test]
    fn test_salary_text() {
        assert_eq!(salary_text(Some(120_000), Some(180_500)), "£120k - £180k");
        assert_eq!(salary_text(Some(120_000), None), "Competitive");
        assert_eq!(salary_text(Some(0), Some(100_000)), "Competitive");
    }

    #[test]
    fn test_role_page_url() {
        assert_eq!(
            role_page_url(Some("CFO")),
            "https://fractional.quest/fractional-cfo-jobs-uk"
        );
        assert_eq!(
            role_page_url(Some("CISO")),
            "https://fractional.quest/fractional-jobs"
        );
        assert_eq!(role_page_url(None), "https://fractional.quest/fractional-jobs");
    }

    #[test]
    fn test_results_cards() {
        let long = "x".repeat(200);
        let plan = parse_search_query("cto", None);
        let results = SearchResults::new("cto", &plan, &[row(Some(&long)), row(None)]);
        assert_eq!(results.total, 2);
        assert_eq!(results.title, "Found 2 cto positions");
        let card = &results.jobs[0];
        assert_eq!(card.company, "Unknown");
        assert_eq!(card.salary, "£120k - £180k");
        assert_eq!(card.description.chars().count(), 153);
        assert!(card.description.ends_with("..."));
        assert_eq!(card.url, "https://fractional.quest/fractional-cto-jobs-uk");
        assert_eq!(results.jobs[1].description, "");
    }
}
