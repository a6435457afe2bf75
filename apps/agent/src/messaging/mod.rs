// Recruiter and coach messages: unread inbox, reading one message (which
// marks it read) and sending a reply.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::models::message::MessageRow;
use crate::text::truncate_chars;

const UNREAD_LIMIT: i64 = 5;
const CONTENT_PREVIEW: usize = 200;
const REPLY_PREVIEW: usize = 50;
const MIN_REPLY_CHARS: usize = 2;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Message too short")]
    TooShort,

    #[error("Message not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageView {
    pub id: i32,
    pub from_user_id: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub sender_name: String,
    pub sender_company: Option<String>,
    pub sender_title: Option<String>,
    pub sender_type: String,
}

impl MessageView {
    fn from_row(row: MessageRow, preview: bool) -> Self {
        let content = row.content.unwrap_or_default();
        MessageView {
            id: row.id,
            from_user_id: row.from_user_id,
            content: if preview {
                truncate_chars(&content, CONTENT_PREVIEW)
            } else {
                content
            },
            created_at: row.created_at,
            sender_name: row.display_name.unwrap_or_else(|| "Unknown".to_string()),
            sender_company: row.company,
            sender_title: row.title,
            sender_type: row.sender_type.unwrap_or_else(|| "recruiter".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Inbox {
    pub unread_count: usize,
    pub messages: Vec<MessageView>,
    pub summary: String,
}

impl Inbox {
    pub fn new(messages: Vec<MessageView>) -> Self {
        let summary = match messages.len() {
            0 => "No unread messages".to_string(),
            1 => "You have 1 unread message".to_string(),
            n => format!("You have {n} unread messages"),
        };
        Inbox {
            unread_count: messages.len(),
            messages,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SentReply {
    pub sent: bool,
    pub message_id: i32,
    pub to_user_id: String,
    pub preview: String,
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.from_user_id, m.content, m.created_at,
           ut.display_name, ut.company, ut.title, ut.type
    FROM messages m
    LEFT JOIN user_types ut ON m.from_user_id = ut.user_id
"#;

/// Newest unread messages for a user, content cut to a preview.
pub async fn unread_messages(pool: &PgPool, user_id: &str) -> Result<Vec<MessageView>, sqlx::Error> {
    let sql = format!(
        "{MESSAGE_SELECT} WHERE m.to_user_id = $1 AND m.read_at IS NULL ORDER BY m.created_at DESC LIMIT $2"
    );
    let rows = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(user_id)
        .bind(UNREAD_LIMIT)
        .fetch_all(pool)
        .await?;

    if !rows.is_empty() {
        info!("Found {} unread messages for user {user_id}", rows.len());
    }
    Ok(rows
        .into_iter()
        .map(|r| MessageView::from_row(r, true))
        .collect())
}

/// Full message addressed to `user_id`; marks it read.
pub async fn read_message(
    pool: &PgPool,
    user_id: &str,
    message_id: i32,
) -> Result<MessageView, MessagingError> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = $1 AND m.to_user_id = $2");
    let row = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(MessagingError::NotFound)?;

    sqlx::query("UPDATE messages SET read_at = NOW() WHERE id = $1")
        .bind(message_id)
        .execute(pool)
        .await?;

    info!("Read message {message_id} for user {user_id}");
    Ok(MessageView::from_row(row, false))
}

/// Trimmed reply body, or `TooShort`.
pub fn validate_reply(content: &str) -> Result<&str, MessagingError> {
    let trimmed = content.trim();
    if trimmed.chars().count() < MIN_REPLY_CHARS {
        return Err(MessagingError::TooShort);
    }
    Ok(trimmed)
}

pub async fn send_reply(
    pool: &PgPool,
    from_user_id: &str,
    to_user_id: &str,
    content: &str,
) -> Result<SentReply, MessagingError> {
    let body = validate_reply(content)?;

    let message_id: i32 = sqlx::query_scalar(
        "INSERT INTO messages (from_user_id, to_user_id, content) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(from_user_id)
    .bind(to_user_id)
    .bind(body)
    .fetch_one(pool)
    .await?;

    info!("Sent reply {message_id} from {from_user_id} to {to_user_id}");
    Ok(SentReply {
        sent: true,
        message_id,
        to_user_id: to_user_id.to_string(),
        preview: truncate_chars(body, REPLY_PREVIEW),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(content: &str) -> MessageRow {
        MessageRow {
            id: 3,
            from_user_id: "rec-1".into(),
            content: Some(content.into()),
            created_at: None,
            display_name: None,
            company: Some("Hunters".into()),
            title: None,
            sender_type: None,
        }
    }

    #[test]
    fn test_reply_validation() {
        assert!(matches!(validate_reply("  a "), Err(MessagingError::TooShort)));
        assert!(matches!(validate_reply(""), Err(MessagingError::TooShort)));
        assert_eq!(validate_reply("  ok  ").unwrap(), "ok");
    }

    #[test]
    fn test_preview_truncates_and_defaults_sender() {
        let view = MessageView::from_row(row(&"y".repeat(250)), true);
        assert_eq!(view.content.chars().count(), 203);
        assert_eq!(view.sender_name, "Unknown");
        assert_eq!(view.sender_type, "recruiter");

        let full = MessageView::from_row(row(&"y".repeat(250)), false);
        assert_eq!(full.content.len(), 250);
    }

    #[test]
    fn test_inbox_summary() {
        assert_eq!(Inbox::new(vec![]).summary, "No unread messages");
        let one = MessageView::from_row(row("hi"), true);
        assert_eq!(Inbox::new(vec![one.clone()]).summary, "You have 1 unread message");
        assert_eq!(
            Inbox::new(vec![one.clone(), one]).summary,
            "You have 2 unread messages"
        );
    }
}
