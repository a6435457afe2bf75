//! Market widgets rendered inline in the chat: charts, a dashboard and
//! A2UI cards. Chart payloads use the field names the frontend charts read
//! (`chartData`, `topRoles`, ...).

use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::jobs::search::salary_text;
use crate::models::job::{CountRow, JobRow};

const CHART_COLORS: &[&str] = &[
    "#6366f1", "#8b5cf6", "#a855f7", "#d946ef", "#ec4899", "#f43f5e", "#f97316", "#eab308",
];
const FALLBACK_AVG_SALARY: f64 = 150_000.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub jobs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub chart_data: Vec<ChartPoint>,
    pub title: &'static str,
    pub subtitle: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DayRate {
    pub role: &'static str,
    pub min: u32,
    pub max: u32,
    pub avg: u32,
}

/// Indicative day rates in £, by role.
pub const DAY_RATES: &[DayRate] = &[
    DayRate { role: "CEO", min: 250, max: 500, avg: 375 },
    DayRate { role: "CFO", min: 200, max: 400, avg: 300 },
    DayRate { role: "CTO", min: 180, max: 380, avg: 280 },
    DayRate { role: "CMO", min: 150, max: 320, avg: 235 },
    DayRate { role: "COO", min: 170, max: 350, avg: 260 },
    DayRate { role: "CHRO", min: 140, max: 280, avg: 210 },
    DayRate { role: "CRO", min: 160, max: 340, avg: 250 },
    DayRate { role: "CPO", min: 150, max: 300, avg: 225 },
];

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: &'static str,
    pub description: &'static str,
    pub image: &'static str,
    pub url: &'static str,
    pub source: &'static str,
}

const ARTICLES: &[Article] = &[
    Article {
        title: "The Rise of Fractional Executives",
        description: "How the fractional model is transforming C-suite hiring",
        image: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400&h=200&fit=crop",
        url: "https://fractional.quest/fractional-executive-meaning",
        source: "Fractional Quest",
    },
    Article {
        title: "CFO vs Fractional CFO: Which Do You Need?",
        description: "A guide to choosing the right finance leadership model",
        image: "https://images.unsplash.com/photo-1554224155-6726b3ff858f?w=400&h=200&fit=crop",
        url: "https://fractional.quest/fractional-cfo-jobs-uk",
        source: "Industry Guide",
    },
    Article {
        title: "Tech Leadership on Demand",
        description: "Why startups are choosing fractional CTOs",
        image: "https://images.unsplash.com/photo-1519389950473-47ba0277781c?w=400&h=200&fit=crop",
        url: "https://fractional.quest/fractional-cto-jobs-uk",
        source: "Tech Insights",
    },
    Article {
        title: "The Future of Executive Work",
        description: "Portfolio careers and the new C-suite paradigm",
        image: "https://images.unsplash.com/photo-1552664730-d307ca884978?w=400&h=200&fit=crop",
        url: "https://fractional.quest/fractional-roles",
        source: "Forbes",
    },
];

async fn count_by(pool: &PgPool, column: Column) -> Result<Vec<CountRow>, sqlx::Error> {
    let sql = match column {
        Column::RoleType => {
            "SELECT role_type AS name, COUNT(*) AS count FROM jobs GROUP BY role_type ORDER BY count DESC"
        }
        Column::Location => {
            "SELECT location AS name, COUNT(*) AS count FROM jobs GROUP BY location ORDER BY count DESC"
        }
    };
    sqlx::query_as::<_, CountRow>(sql).fetch_all(pool).await
}

#[derive(Clone, Copy)]
enum Column {
    RoleType,
    Location,
}

fn label(name: Option<String>) -> String {
    name.unwrap_or_else(|| "Unspecified".to_string())
}

/// Bar chart of open jobs per role type.
pub async fn role_chart(pool: &PgPool) -> Result<Chart, sqlx::Error> {
    let rows = count_by(pool, Column::RoleType).await?;
    let chart_data = rows
        .into_iter()
        .enumerate()
        .map(|(i, r)| ChartPoint {
            name: label(r.name),
            jobs: r.count,
            fill: Some(CHART_COLORS[i % CHART_COLORS.len()]),
        })
        .collect();
    Ok(Chart {
        chart_data,
        title: "Fractional Executive Roles Distribution",
        subtitle: "Live data from the job board",
    })
}

/// Pie chart of open jobs per location.
pub async fn location_chart(pool: &PgPool) -> Result<Chart, sqlx::Error> {
    let rows = count_by(pool, Column::Location).await?;
    let chart_data = rows
        .into_iter()
        .map(|r| ChartPoint {
            name: label(r.name),
            jobs: r.count,
            fill: None,
        })
        .collect();
    Ok(Chart {
        chart_data,
        title: "Jobs by Location",
        subtitle: "Geographic distribution of open roles",
    })
}

pub fn salary_insights() -> Value {
    json!({
        "chartData": DAY_RATES,
        "title": "Fractional Executive Day Rates (£)",
        "subtitle": "Market rate ranges by role",
    })
}

pub fn featured_articles() -> Value {
    json!({ "articles": ARTICLES, "title": "Featured Insights" })
}

struct MarketTotals {
    jobs: i64,
    companies: i64,
    avg_salary: f64,
}

async fn market_totals(pool: &PgPool) -> Result<MarketTotals, sqlx::Error> {
    let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await?;
    let companies: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT company) FROM jobs")
        .fetch_one(pool)
        .await?;
    let avg: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(salary_max)::FLOAT8 FROM jobs WHERE salary_max IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(MarketTotals {
        jobs,
        companies,
        avg_salary: avg.unwrap_or(FALLBACK_AVG_SALARY),
    })
}

fn thousands(amount: f64) -> String {
    format!("£{}k", (amount / 1000.0) as i64)
}

pub async fn market_dashboard(pool: &PgPool) -> Result<Value, sqlx::Error> {
    let totals = market_totals(pool).await?;
    let top_roles: Vec<Value> = count_by(pool, Column::RoleType)
        .await?
        .into_iter()
        .take(5)
        .map(|r| json!({ "name": label(r.name), "count": r.count }))
        .collect();

    Ok(json!({
        "metrics": {
            "totalJobs": totals.jobs,
            "totalCompanies": totals.companies,
            "remoteJobs": 0,
            "avgDayRate": thousands(totals.avg_salary),
        },
        "topRoles": top_roles,
        "title": "Fractional Executive Market Dashboard",
        "lastUpdated": "Live",
    }))
}

pub async fn stats_widget(pool: &PgPool) -> Result<Value, sqlx::Error> {
    let totals = market_totals(pool).await?;
    let stat = |value: String, caption: &str| {
        json!({
            "type": "column",
            "children": [
                { "type": "text", "variant": "h2", "text": value },
                { "type": "text", "variant": "caption", "text": caption },
            ]
        })
    };

    Ok(json!({
        "a2ui": {
            "type": "card",
            "children": [
                { "type": "text", "variant": "h1", "text": "📈 Market Snapshot" },
                {
                    "type": "row",
                    "children": [
                        stat(totals.jobs.to_string(), "Active Jobs"),
                        stat(totals.companies.to_string(), "Companies"),
                        stat(thousands(totals.avg_salary), "Avg Salary"),
                    ]
                },
                { "type": "divider" },
                { "type": "text", "variant": "body", "text": "Live data from the job board" },
            ]
        },
        "title": "Market Statistics",
    }))
}

fn slug(s: &str) -> String {
    s.to_lowercase().replace(' ', "-")
}

/// A2UI card for the newest job matching `role`.
pub async fn job_card(pool: &PgPool, role: &str) -> Result<Value, sqlx::Error> {
    let pattern = format!("%{}%", role.trim());
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, title, company, location, salary_min, salary_max, description, role_type
        FROM jobs
        WHERE title ILIKE $1 OR role_type ILIKE $1
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(&pattern)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(row) => render_job_card(role, &row),
        None => json!({ "a2ui": { "type": "text", "text": format!("No {role} jobs found") } }),
    })
}

fn render_job_card(role: &str, row: &JobRow) -> Value {
    let company = row.company.as_deref().unwrap_or("Unknown");
    let url = format!(
        "https://fractional.quest/job/{}-{}",
        slug(&row.title),
        slug(company)
    );
    let salary = match salary_text(row.salary_min, row.salary_max).as_str() {
        "Competitive" => String::new(),
        s => format!("💰 {s}"),
    };

    json!({
        "a2ui": {
            "type": "card",
            "children": [
                {
                    "type": "image",
                    "url": "https://images.unsplash.com/photo-1560472354-b33ff0c44a43?w=400&h=150&fit=crop",
                    "alt": "Executive office"
                },
                { "type": "text", "variant": "h2", "text": row.title },
                { "type": "text", "variant": "body", "text": format!("🏢 {company}") },
                { "type": "text", "variant": "caption", "text": format!("📍 {}", row.location.as_deref().unwrap_or("Remote")) },
                { "type": "text", "variant": "caption", "text": salary },
                { "type": "text", "variant": "body", "text": row.description.as_deref().unwrap_or("") },
                { "type": "link", "text": "View full job details →", "url": url },
                {
                    "type": "row",
                    "children": [
                        { "type": "button", "label": "Apply Now", "variant": "primary", "url": url },
                        { "type": "button", "label": "View More Jobs", "variant": "secondary", "url": "https://fractional.quest/jobs" }
                    ]
                }
            ]
        },
        "title": format!("Featured {role} Position"),
    })
}
