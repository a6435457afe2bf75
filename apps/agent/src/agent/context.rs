use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::agent::scene::AmbientScene;
use crate::identity::{PageContext, UserIdentity};
use crate::jobs::JobSummary;
use crate::memory::{build_context, MemoryContext};
use crate::messaging::{unread_messages, MessageView};
use crate::state::AppState;

/// A tool result the client should render (chart, card, graph...).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Widget {
    pub tool: String,
    pub data: Value,
}

/// Everything the agent knows about the current request. Built per request
/// and dropped with it; tools read and update it.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub identity: UserIdentity,
    pub page: Option<PageContext>,
    pub memory: MemoryContext,
    pub unread: Vec<MessageView>,
    pub jobs: Vec<JobSummary>,
    pub search_query: Option<String>,
    /// Target of "that job" follow-ups.
    pub last_discussed_job: Option<JobSummary>,
    pub scene: Option<AmbientScene>,
    pub widgets: Vec<Widget>,
}

impl AgentContext {
    pub fn new(identity: UserIdentity, page: Option<PageContext>) -> Self {
        AgentContext {
            identity,
            page,
            memory: MemoryContext::empty(),
            unread: Vec::new(),
            jobs: Vec::new(),
            search_query: None,
            last_discussed_job: None,
            scene: None,
            widgets: Vec::new(),
        }
    }

    /// New context with remembered facts and unread messages loaded.
    /// Both lookups fail open.
    pub async fn load(state: &AppState, identity: UserIdentity, page: Option<PageContext>) -> Self {
        let mut ctx = Self::new(identity, page);
        let Some(user_id) = ctx.identity.user_id().map(str::to_string) else {
            return ctx;
        };

        ctx.memory = build_context(state.memory.get(), Some(&user_id)).await;

        if let Some(pool) = state.db.get() {
            match unread_messages(pool, &user_id).await {
                Ok(messages) => ctx.unread = messages,
                Err(e) => warn!("Could not load unread messages for {user_id}: {e}"),
            }
        }
        ctx
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.user_id()
    }

    pub fn push_widget(&mut self, tool: &str, data: Value) {
        self.widgets.push(Widget {
            tool: tool.to_string(),
            data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_offline_is_empty() {
        let identity = UserIdentity {
            user_id: Some("u1".into()),
            display_name: None,
            email: None,
        };
        let ctx = AgentContext::load(&AppState::offline(), identity, None).await;
        assert_eq!(ctx.memory, MemoryContext::empty());
        assert!(ctx.unread.is_empty());
        assert_eq!(ctx.user_id(), Some("u1"));
    }

    #[test]
    fn test_push_widget() {
        let mut ctx = AgentContext::new(UserIdentity::default(), None);
        ctx.push_widget("show_salary_insights", json!({ "title": "x" }));
        assert_eq!(ctx.widgets[0].tool, "show_salary_insights");
    }
}
