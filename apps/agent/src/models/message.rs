use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-to-user message joined with the sender's `user_types` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: i32,
    pub from_user_id: String,
    pub content: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub display_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    #[sqlx(rename = "type")]
    pub sender_type: Option<String>,
}
