// Conversation memory: a managed memory-graph service that extracts facts
// from appended messages and answers fact searches.
// All calls are best-effort; callers degrade to empty results on failure.

pub mod client;
pub mod context;
pub mod entities;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use client::ZepClient;
pub use context::{build_context, MemoryContext, OnboardingStage, ProfileField};

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Memory service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid memory service configuration: {0}")]
    Config(String),
}

/// One extracted statement about a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FactEdge {
    #[serde(default)]
    pub fact: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Searches the user's graph for fact edges relevant to `query`.
    async fn search_facts(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactEdge>, MemoryError>;

    /// Appends a message to a thread; the service extracts facts from it.
    async fn append_message(
        &self,
        thread_id: &str,
        user_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), MemoryError>;
}

/// Appends a message and swallows failures.
pub async fn remember(
    memory: &dyn MemoryService,
    thread_id: &str,
    user_id: &str,
    role: &str,
    content: &str,
) {
    match memory.append_message(thread_id, user_id, role, content).await {
        Ok(()) => info!("Stored {role} message for user {user_id}"),
        Err(e) => warn!("Error storing {role} message in memory: {e}"),
    }
}

/// Thread that receives facts written by the preference tool.
pub fn profile_thread_id(user_id: &str) -> String {
    format!("profile_{user_id}")
}

/// Thread for one voice session.
pub fn voice_thread_id(session_id: Option<&str>) -> String {
    format!("voice_{}", session_id.unwrap_or("unknown"))
}
