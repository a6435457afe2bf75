// Career-advisor agent: builds the system prompt from the request context,
// then runs the model with tools until it answers in plain text.

pub mod context;
pub mod graph;
pub mod prompts;
pub mod scene;
pub mod tools;

use tracing::{error, info, warn};

use crate::agent::context::AgentContext;
use crate::agent::prompts::build_system_prompt;
use crate::llm_client::{ContentBlock, Message, Role};
use crate::state::AppState;

/// Upper bound on model round trips for one user turn.
pub const MAX_TOOL_ROUNDS: usize = 6;

/// Reply used when the model is unavailable or never settles on an answer.
pub fn fallback_reply(name: Option<&str>) -> String {
    match name {
        Some(name) => format!(
            "Hi {name}! I can help you find fractional executive roles. \
             What type of position interests you - CTO, CFO, CMO, COO, or CHRO?"
        ),
        None => "I can help you find fractional executive roles. What type of position interests you?"
            .to_string(),
    }
}

/// Answers the latest user turn in `history`. Never fails: LLM errors and
/// exhausted tool rounds fall back to a canned reply.
pub async fn run(state: &AppState, ctx: &mut AgentContext, mut history: Vec<Message>) -> String {
    let fallback = fallback_reply(ctx.identity.display_name());
    let Some(llm) = state.llm.get() else {
        warn!("Agent called without LLM: {}", state.llm.reason());
        return fallback;
    };
    if history.is_empty() {
        return fallback;
    }

    let tool_defs = tools::definitions();

    for round in 0..MAX_TOOL_ROUNDS {
        // Rebuilt every round: tools may change the page, scene or last job.
        let system = build_system_prompt(ctx);
        let response = match llm.call(&system, &history, &tool_defs).await {
            Ok(r) => r,
            Err(e) => {
                error!("LLM call failed in round {round}: {e}");
                return fallback;
            }
        };

        let calls = response.tool_calls();
        if calls.is_empty() || !response.wants_tools() {
            return response.text().unwrap_or(fallback);
        }

        info!("Round {round}: model requested {} tool(s)", calls.len());
        history.push(Message {
            role: Role::Assistant,
            content: response
                .content
                .into_iter()
                .filter(|b| !matches!(b, ContentBlock::Unsupported))
                .collect(),
        });

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            let output = tools::dispatch(state, ctx, call).await;
            results.push(ContentBlock::ToolResult {
                tool_use_id: call.id.clone(),
                content: output.content.to_string(),
                is_error: output.is_error,
            });
        }
        history.push(Message {
            role: Role::User,
            content: results,
        });
    }

    warn!("Agent gave up after {MAX_TOOL_ROUNDS} tool rounds");
    fallback
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::identity::UserIdentity;
    use crate::llm_client::LlmClient;
    use crate::state::Backend;

    /// Fake Messages API: the first call asks for a tool, later calls answer.
    async fn fake_messages(
        State(calls): State<Arc<AtomicUsize>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            return Json(json!({
                "content": [{
                    "type": "tool_use", "id": "tu_1",
                    "name": "set_ambient_scene", "input": { "location": "London" }
                }],
                "stop_reason": "tool_use",
                "usage": { "input_tokens": 1, "output_tokens": 1 }
            }));
        }
        let last = &body["messages"].as_array().unwrap().last().unwrap()["content"][0];
        assert_eq!(last["type"], "tool_result");
        assert_eq!(last["tool_use_id"], "tu_1");
        Json(json!({
            "content": [{ "type": "text", "text": "London looks great." }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 1, "output_tokens": 1 }
        }))
    }

    /// Always asks for another tool.
    async fn looping_messages() -> Json<Value> {
        Json(json!({
            "content": [{ "type": "tool_use", "id": "tu", "name": "get_page_info", "input": {} }],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 1, "output_tokens": 1 }
        }))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/messages")
    }

    fn state_with_llm(endpoint: String) -> AppState {
        let mut state = AppState::offline();
        let client = LlmClient::new("test-key".into()).unwrap().with_endpoint(endpoint);
        state.llm = Backend::Available(Arc::new(client));
        state
    }

    fn jane() -> UserIdentity {
        UserIdentity {
            user_id: Some("u1".into()),
            display_name: Some("Jane".into()),
            email: None,
        }
    }

    #[test]
    fn test_fallback_reply() {
        assert!(fallback_reply(Some("Jane")).starts_with("Hi Jane!"));
        assert!(fallback_reply(None).starts_with("I can help"));
    }

    #[tokio::test]
    async fn test_without_llm_returns_fallback() {
        let mut ctx = AgentContext::new(jane(), None);
        let reply = run(
            &AppState::offline(),
            &mut ctx,
            vec![Message::text(Role::User, "hello")],
        )
        .await;
        assert_eq!(reply, fallback_reply(Some("Jane")));
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/v1/messages", post(fake_messages))
            .with_state(calls.clone());
        let state = state_with_llm(serve(app).await);

        let mut ctx = AgentContext::new(jane(), None);
        let reply = run(&state, &mut ctx, vec![Message::text(Role::User, "I'm in London")]).await;

        assert_eq!(reply, "London looks great.");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.scene.unwrap().query, "london skyline cityscape");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_rounds() {
        let app = Router::new().route("/v1/messages", post(looping_messages));
        let state = state_with_llm(serve(app).await);

        let mut ctx = AgentContext::new(UserIdentity::default(), None);
        let reply = run(&state, &mut ctx, vec![Message::text(Role::User, "hi")]).await;
        assert_eq!(reply, fallback_reply(None));
    }
}
