use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub description: Option<String>,
    pub role_type: Option<String>,
}

/// Aggregate row for the chart widgets (`GROUP BY` queries).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CountRow {
    pub name: Option<String>,
    pub count: i64,
}
