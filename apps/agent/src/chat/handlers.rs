use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::agent::context::{AgentContext, Widget};
use crate::agent::scene::AmbientScene;
use crate::agent::{self, fallback_reply};
use crate::chat::sse::stream_reply;
use crate::chat::{fast_path, instruction_text, last_user_message, to_history, ChatMessage};
use crate::errors::AppError;
use crate::identity::resolver::short_id;
use crate::identity::{decode_session_token, resolve, PageContext, StructuredUser};
use crate::jobs::JobSummary;
use crate::memory::{remember, voice_thread_id};
use crate::state::{AppState, Backend};
use crate::text::truncate_chars;

const SESSION_HEADERS: &[&str] = &["x-hume-session-id", "x-session-id", "x-custom-session-id"];

#[derive(Debug, Default, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub custom_session_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub custom_session_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub custom_session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WidgetState {
    #[serde(default)]
    pub user: Option<StructuredUser>,
    #[serde(default)]
    pub page_context: Option<PageContext>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub state: WidgetState,
}

#[derive(Debug, Serialize)]
pub struct WidgetChatResponse {
    pub reply: String,
    pub logged_in: bool,
    pub jobs: Vec<JobSummary>,
    pub scene: Option<AmbientScene>,
    pub widgets: Vec<Widget>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// First non-empty of: body, body metadata, gateway headers, query string.
pub fn extract_session_id(
    body: &CompletionRequest,
    headers: &HeaderMap,
    query: &SessionQuery,
) -> Option<String> {
    let metadata = body.metadata.as_ref();
    non_empty(body.custom_session_id.as_ref())
        .or_else(|| non_empty(body.session_id.as_ref()))
        .or_else(|| non_empty(metadata.and_then(|m| m.custom_session_id.as_ref())))
        .or_else(|| non_empty(metadata.and_then(|m| m.session_id.as_ref())))
        .or_else(|| {
            SESSION_HEADERS.iter().find_map(|name| {
                headers
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(String::from)
            })
        })
        .or_else(|| non_empty(query.custom_session_id.as_ref()))
}

/// POST /chat/completions
/// Voice gateway endpoint. Always answers with an SSE stream.
pub async fn handle_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
    Json(body): Json<CompletionRequest>,
) -> impl IntoResponse {
    let session_id = extract_session_id(&body, &headers, &query);
    let token = decode_session_token(session_id.as_deref().unwrap_or_default());
    let instructions = instruction_text(&body.messages);
    let identity = resolve(token.to_structured_user().as_ref(), instructions.as_deref());
    let page = token.page_context.clone();

    info!(
        "Voice turn: user={}, id={}",
        identity.display_name().unwrap_or("anon"),
        identity.user_id().map(short_id).unwrap_or("none")
    );

    let user_msg = last_user_message(&body.messages).unwrap_or_default().to_string();
    info!("Voice query: {}", truncate_chars(&user_msg, 80));

    if let Some(reply) = fast_path::answer(&user_msg, identity.display_name(), page.as_ref()) {
        return stream_reply(&reply);
    }

    let mut ctx = AgentContext::load(&state, identity, page).await;
    let history = to_history(&body.messages);
    let reply = agent::run(&state, &mut ctx, history).await;
    info!("Voice reply: {}", truncate_chars(&reply, 80));

    if let (Some(user_id), Backend::Available(memory)) = (ctx.user_id(), state.memory.clone()) {
        if !user_msg.is_empty() {
            let thread_id = voice_thread_id(session_id.as_deref());
            let user_id = user_id.to_string();
            let assistant_reply = reply.clone();
            tokio::spawn(async move {
                remember(memory.as_ref(), &thread_id, &user_id, "user", &user_msg).await;
                remember(memory.as_ref(), &thread_id, &user_id, "assistant", &assistant_reply)
                    .await;
            });
        }
    }

    stream_reply(&reply)
}

/// GET /chat/completions
pub async fn handle_completions_probe() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Use POST for chat completions" }))
}

/// POST /api/v1/chat
/// Web widget endpoint. Returns the reply with everything the tools produced.
pub async fn handle_widget_chat(
    State(state): State<AppState>,
    Json(req): Json<WidgetChatRequest>,
) -> Result<Json<WidgetChatResponse>, AppError> {
    if last_user_message(&req.messages).is_none() {
        return Err(AppError::Validation("No user message to answer".to_string()));
    }

    let instructions = instruction_text(&req.messages);
    let identity = resolve(req.state.user.as_ref(), instructions.as_deref());
    let logged_in = identity.is_logged_in();
    let name = identity.display_name().map(String::from);

    let mut ctx = AgentContext::load(&state, identity, req.state.page_context).await;
    let history = to_history(&req.messages);
    let reply = if history.is_empty() {
        fallback_reply(name.as_deref())
    } else {
        agent::run(&state, &mut ctx, history).await
    };

    Ok(Json(WidgetChatResponse {
        reply,
        logged_in,
        jobs: ctx.jobs,
        scene: ctx.scene,
        widgets: ctx.widgets,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{HeaderValue, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::build_router;

    fn completion(body: Value) -> CompletionRequest {
        serde_json::from_value(body).unwrap()
    }

    async fn post(uri: &str, body: Value, header: Option<(&str, &str)>) -> (StatusCode, String) {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some((name, value)) = header {
            request = request.header(name, value);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();
        let response = build_router(AppState::offline()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Reassembles the streamed reply from SSE `data:` lines.
    fn streamed_text(body: &str) -> String {
        body.lines()
            .filter_map(|l| l.strip_prefix("data: "))
            .filter(|d| *d != "[DONE]")
            .filter_map(|d| serde_json::from_str::<Value>(d).ok())
            .filter_map(|c| c["choices"][0]["delta"]["content"].as_str().map(String::from))
            .collect()
    }

    #[test]
    fn test_session_id_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", HeaderValue::from_static("from-header"));
        let query = SessionQuery {
            custom_session_id: Some("from-query".into()),
        };

        let body = completion(json!({ "session_id": "body", "metadata": { "session_id": "meta" } }));
        assert_eq!(extract_session_id(&body, &headers, &query).as_deref(), Some("body"));

        let body = completion(json!({ "custom_session_id": "", "metadata": { "session_id": "meta" } }));
        assert_eq!(extract_session_id(&body, &headers, &query).as_deref(), Some("meta"));

        let body = completion(json!({}));
        assert_eq!(
            extract_session_id(&body, &headers, &query).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            extract_session_id(&body, &HeaderMap::new(), &query).as_deref(),
            Some("from-query")
        );
        assert_eq!(
            extract_session_id(&body, &HeaderMap::new(), &SessionQuery::default()),
            None
        );
    }

    #[tokio::test]
    async fn test_name_fast_path_streams() {
        let (status, body) = post(
            "/chat/completions",
            json!({ "messages": [{ "role": "user", "content": "What's my name?" }] }),
            Some(("x-hume-session-id", "Jane|fractional_abc123")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            streamed_text(&body),
            "Your name is Jane! I remembered that from when you logged in."
        );
        assert!(body.contains("\"finish_reason\":\"stop\""));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_page_fast_path_uses_token_page() {
        let (_, body) = post(
            "/chat/completions",
            json!({
                "custom_session_id": "Jane|fractional_abc123|location:London,jobs:25",
                "messages": [{ "role": "user", "content": "which page are we on" }]
            }),
            None,
        )
        .await;
        assert!(streamed_text(&body).starts_with("We're on the London jobs page. There are 25"));
    }

    #[tokio::test]
    async fn test_agent_fallback_when_llm_missing() {
        let (_, body) = post(
            "/chat/completions",
            json!({
                "session_id": "Jane|fractional_abc123",
                "messages": [{ "role": "user", "content": "find me CFO work" }]
            }),
            None,
        )
        .await;
        assert_eq!(streamed_text(&body), fallback_reply(Some("Jane")));
    }

    #[tokio::test]
    async fn test_probe() {
        let request = Request::builder()
            .uri("/chat/completions")
            .body(Body::empty())
            .unwrap();
        let response = build_router(AppState::offline()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Use POST for chat completions");
    }

    #[tokio::test]
    async fn test_widget_chat_reports_login_and_fallback() {
        let (status, body) = post(
            "/api/v1/chat",
            json!({
                "messages": [{ "role": "user", "content": "hello" }],
                "state": {
                    "user": { "id": "u1", "firstName": "Jane" },
                    "page_context": { "location_filter": "Leeds", "total_jobs_on_page": 4 }
                }
            }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["logged_in"], true);
        assert_eq!(body["reply"], fallback_reply(Some("Jane")));
        assert_eq!(body["jobs"], json!([]));
        assert!(body["scene"].is_null());
    }

    #[tokio::test]
    async fn test_widget_chat_identity_from_instructions() {
        let (_, body) = post(
            "/api/v1/chat",
            json!({
                "messages": [
                    { "role": "system", "content": "User ID: 4f2a\nUser Name: Sam" },
                    { "role": "user", "content": "hi" }
                ]
            }),
            None,
        )
        .await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["logged_in"], true);
        assert!(body["reply"].as_str().unwrap().starts_with("Hi Sam!"));
    }

    #[tokio::test]
    async fn test_widget_chat_without_user_message_is_400() {
        let (status, _) = post(
            "/api/v1/chat",
            json!({ "messages": [{ "role": "assistant", "content": "hi" }] }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
