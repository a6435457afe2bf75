//! Tools the model can call. Every tool returns JSON; failures come back as
//! `{"error": ...}` objects flagged as errors so the model can recover.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::agent::context::AgentContext;
use crate::agent::graph::{build_user_graph, guest_graph};
use crate::agent::scene::compose_scene;
use crate::jobs::insights;
use crate::jobs::{parse_search_query, search_jobs, JobSummary, SearchResults};
use crate::llm_client::{ToolCall, ToolDefinition};
use crate::memory::{profile_thread_id, remember};
use crate::messaging::{read_message, send_reply, unread_messages, Inbox};
use crate::preferences::{save_user_preference, ItemType, SOURCE_CONVERSATION};
use crate::state::{AppState, Backend};

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: Value,
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(content: Value) -> Self {
        ToolOutput {
            content,
            is_error: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ToolOutput {
            content: json!({ "error": message.into() }),
            is_error: true,
        }
    }
}

fn no_args() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_user_profile",
            description: "Get the current user's name, id and email. Use for 'who am I' or 'my profile'.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "get_page_info",
            description: "Get the page the user is viewing. Use for 'what page' or 'where am I'.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "save_user_preference",
            description: "Save a preference to the user's profile. location and role_preference hold one value \
                          (a new one replaces the old); skill and company can hold many.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "preference_type": {
                        "type": "string",
                        "description": "One of location, role_preference (or role), skill (or experience), company"
                    },
                    "value": { "type": "string", "description": "e.g. London, CTO, Python" }
                },
                "required": ["preference_type", "value"]
            }),
        },
        ToolDefinition {
            name: "search_jobs",
            description: "Search open jobs and show them as cards. Use for 'show jobs', 'find roles', \
                          '3 most recent CFO positions'.",
            input_schema: json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "show_jobs_chart",
            description: "Bar chart of open jobs by role type.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "show_location_chart",
            description: "Pie chart of open jobs by location.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "show_salary_insights",
            description: "Day-rate ranges by executive role.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "show_market_dashboard",
            description: "Market dashboard: totals, average rate and top roles.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "get_featured_articles",
            description: "Featured articles about fractional executive work.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "show_job_card",
            description: "Rich card for the newest job matching a role.",
            input_schema: json!({
                "type": "object",
                "properties": { "role": { "type": "string", "description": "e.g. CTO" } },
                "required": ["role"]
            }),
        },
        ToolDefinition {
            name: "show_user_graph",
            description: "Show the user's interest graph. Only when they ask to SEE their profile.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "show_stats_widget",
            description: "Market snapshot widget with live job counts.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "set_ambient_scene",
            description: "Change the background scene when a location or role comes up. Call silently.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string" },
                    "role": { "type": "string" }
                }
            }),
        },
        ToolDefinition {
            name: "get_my_messages",
            description: "List the user's unread messages from recruiters and coaches.",
            input_schema: no_args(),
        },
        ToolDefinition {
            name: "read_full_message",
            description: "Read one message in full and mark it read.",
            input_schema: json!({
                "type": "object",
                "properties": { "message_id": { "type": "integer" } },
                "required": ["message_id"]
            }),
        },
        ToolDefinition {
            name: "reply_to_message",
            description: "Send a reply to a recruiter or coach.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to_user_id": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["to_user_id", "content"]
            }),
        },
    ]
}

#[derive(Deserialize)]
struct SavePreferenceArgs {
    preference_type: String,
    value: String,
}

#[derive(Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Deserialize)]
struct RoleArgs {
    role: String,
}

#[derive(Deserialize, Default)]
struct SceneArgs {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
struct ReadMessageArgs {
    message_id: i32,
}

#[derive(Deserialize)]
struct ReplyArgs {
    to_user_id: String,
    content: String,
}

fn args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolOutput> {
    serde_json::from_value(call.input.clone())
        .map_err(|e| ToolOutput::error(format!("Invalid arguments for {}: {e}", call.name)))
}

fn database(state: &AppState) -> Result<&PgPool, ToolOutput> {
    state.db.get().ok_or_else(|| ToolOutput::error(state.db.reason()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

/// Runs one tool call against the request context.
pub async fn dispatch(state: &AppState, ctx: &mut AgentContext, call: &ToolCall) -> ToolOutput {
    info!("Tool call: {}", call.name);
    let result = match call.name.as_str() {
        "get_user_profile" => Ok(get_user_profile(ctx)),
        "get_page_info" => Ok(get_page_info(ctx)),
        "save_user_preference" => match args::<SavePreferenceArgs>(call) {
            Ok(a) => Ok(save_preference(state, ctx, &a.preference_type, &a.value).await),
            Err(e) => Err(e),
        },
        "search_jobs" => match args::<QueryArgs>(call) {
            Ok(a) => run_search(state, ctx, &a.query).await,
            Err(e) => Err(e),
        },
        "show_jobs_chart" => widget(state, ctx, call, |pool| async move {
            insights::role_chart(&pool).await.map(|c| to_json(&c))
        })
        .await,
        "show_location_chart" => widget(state, ctx, call, |pool| async move {
            insights::location_chart(&pool).await.map(|c| to_json(&c))
        })
        .await,
        "show_market_dashboard" => {
            widget(state, ctx, call, |pool| async move {
                insights::market_dashboard(&pool).await
            })
            .await
        }
        "show_stats_widget" => {
            widget(state, ctx, call, |pool| async move { insights::stats_widget(&pool).await })
                .await
        }
        "show_job_card" => match args::<RoleArgs>(call) {
            Ok(a) => {
                widget(state, ctx, call, |pool| async move {
                    insights::job_card(&pool, &a.role).await
                })
                .await
            }
            Err(e) => Err(e),
        },
        "show_salary_insights" => {
            let data = insights::salary_insights();
            ctx.push_widget(&call.name, data.clone());
            Ok(data)
        }
        "get_featured_articles" => {
            let data = insights::featured_articles();
            ctx.push_widget(&call.name, data.clone());
            Ok(data)
        }
        "show_user_graph" => Ok(show_user_graph(state, ctx).await),
        "set_ambient_scene" => {
            let a: SceneArgs = args(call).unwrap_or_default();
            Ok(set_ambient_scene(ctx, a.location.as_deref(), a.role.as_deref()))
        }
        "get_my_messages" => get_my_messages(state, ctx).await,
        "read_full_message" => match args::<ReadMessageArgs>(call) {
            Ok(a) => read_full_message(state, ctx, a.message_id).await,
            Err(e) => Err(e),
        },
        "reply_to_message" => match args::<ReplyArgs>(call) {
            Ok(a) => reply_to_message(state, ctx, &a.to_user_id, &a.content).await,
            Err(e) => Err(e),
        },
        other => Err(ToolOutput::error(format!("Unknown tool: {other}"))),
    };

    result.map(ToolOutput::ok).unwrap_or_else(|e| {
        warn!("Tool {} failed: {}", call.name, e.content);
        e
    })
}

/// Database-backed widget: runs the query, records the widget, returns its data.
async fn widget<F, Fut>(
    state: &AppState,
    ctx: &mut AgentContext,
    call: &ToolCall,
    query: F,
) -> Result<Value, ToolOutput>
where
    F: FnOnce(PgPool) -> Fut,
    Fut: std::future::Future<Output = Result<Value, sqlx::Error>>,
{
    let pool = database(state)?.clone();
    let data = query(pool)
        .await
        .map_err(|e| ToolOutput::error(format!("Database error: {e}")))?;
    ctx.push_widget(&call.name, data.clone());
    Ok(data)
}

fn get_user_profile(ctx: &AgentContext) -> Value {
    let identity = &ctx.identity;
    if identity.user_id().is_none() && identity.display_name().is_none() {
        return json!({ "logged_in": false, "message": "User is not logged in" });
    }
    json!({
        "logged_in": identity.is_logged_in(),
        "user_id": identity.user_id(),
        "name": identity.display_name().unwrap_or("Unknown"),
        "email": identity.email,
    })
}

fn get_page_info(ctx: &AgentContext) -> Value {
    match &ctx.page {
        None => json!({ "page": "main", "location": null, "jobs_count": 0 }),
        Some(page) => json!({
            "page": page.page_type.clone().unwrap_or_else(|| match &page.location {
                Some(loc) => format!("jobs_{}", loc.to_lowercase()),
                None => "main".to_string(),
            }),
            "location": page.location,
            "jobs_count": page.total_jobs.unwrap_or(0),
            "top_roles": page.top_roles,
        }),
    }
}

fn fact_message(item_type: ItemType, value: &str) -> String {
    match item_type {
        ItemType::Location => format!("User is based in {value}"),
        ItemType::RolePreference => format!("User is interested in {value} roles"),
        ItemType::Skill => format!("User has experience with {value}"),
        ItemType::Company => format!("User has worked at {value}"),
    }
}

async fn save_preference(
    state: &AppState,
    ctx: &mut AgentContext,
    preference_type: &str,
    raw_value: &str,
) -> Value {
    let Some(user_id) = ctx.user_id().map(str::to_string) else {
        return json!({ "saved": false, "message": "User not logged in" });
    };
    let Some(store) = state.profiles.get() else {
        return json!({ "saved": false, "error": state.profiles.reason() });
    };

    let outcome =
        save_user_preference(store, &user_id, preference_type, raw_value, SOURCE_CONVERSATION)
            .await;
    let mut result = to_json(&outcome);
    if !outcome.saved {
        return result;
    }

    let item_type = ItemType::from_preference_name(preference_type);
    let value = outcome.value.clone().unwrap_or_default();
    match item_type {
        Some(ItemType::Location) => ctx.scene = Some(compose_scene(Some(&value), None)),
        Some(ItemType::RolePreference) => ctx.scene = Some(compose_scene(None, Some(&value))),
        _ => {}
    }

    if let (Some(item_type), Backend::Available(memory)) = (item_type, state.memory.clone()) {
        let content = fact_message(item_type, &value);
        let thread_id = profile_thread_id(&user_id);
        tokio::spawn(async move {
            remember(memory.as_ref(), &thread_id, &user_id, "user", &content).await;
        });
    }

    result["graph_updated"] = json!(true);
    result
}

async fn run_search(
    state: &AppState,
    ctx: &mut AgentContext,
    query: &str,
) -> Result<Value, ToolOutput> {
    let pool = database(state)?;
    let page_location = ctx.page.as_ref().and_then(|p| p.location.as_deref());
    let plan = parse_search_query(query, page_location);

    let rows = search_jobs(pool, &plan)
        .await
        .map_err(|e| ToolOutput::error(format!("Database error: {e}")))?;

    ctx.jobs = rows.iter().map(JobSummary::from).collect();
    ctx.search_query = Some(query.to_string());
    if let Some(first) = ctx.jobs.first() {
        info!("Tracking last discussed job: {} at {}", first.title, first.company);
        ctx.last_discussed_job = Some(first.clone());
    }

    let data = to_json(&SearchResults::new(query, &plan, &rows));
    ctx.push_widget("search_jobs", data.clone());
    Ok(data)
}

async fn show_user_graph(state: &AppState, ctx: &mut AgentContext) -> Value {
    let Some(user_id) = ctx.user_id().map(str::to_string) else {
        return to_json(&guest_graph());
    };
    let name = ctx.identity.display_name().unwrap_or("You").to_string();

    let items = match state.profiles.get() {
        Some(store) => store.list(&user_id, None).await.unwrap_or_else(|e| {
            warn!("Could not load profile items for graph: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let graph = to_json(&build_user_graph(&name, &items, &ctx.memory.facts));
    ctx.push_widget("show_user_graph", graph.clone());
    graph
}

fn set_ambient_scene(ctx: &mut AgentContext, location: Option<&str>, role: Option<&str>) -> Value {
    let scene = compose_scene(location, role);
    let result = json!({
        "scene_updated": true,
        "location": scene.location,
        "role": scene.role,
        "query": scene.query,
        "message": format!("Background updated to show {}", scene.query),
    });
    ctx.scene = Some(scene);
    result
}

fn require_user(ctx: &AgentContext) -> Result<String, ToolOutput> {
    ctx.user_id()
        .map(str::to_string)
        .ok_or_else(|| ToolOutput::error("User not logged in"))
}

async fn get_my_messages(state: &AppState, ctx: &AgentContext) -> Result<Value, ToolOutput> {
    let user_id = require_user(ctx)?;
    let pool = database(state)?;
    let messages = unread_messages(pool, &user_id)
        .await
        .map_err(|e| ToolOutput::error(format!("Database error: {e}")))?;
    Ok(to_json(&Inbox::new(messages)))
}

async fn read_full_message(
    state: &AppState,
    ctx: &AgentContext,
    message_id: i32,
) -> Result<Value, ToolOutput> {
    let user_id = require_user(ctx)?;
    let pool = database(state)?;
    let message = read_message(pool, &user_id, message_id)
        .await
        .map_err(|e| ToolOutput::error(e.to_string()))?;
    let mut value = to_json(&message);
    value["marked_read"] = json!(true);
    Ok(value)
}

async fn reply_to_message(
    state: &AppState,
    ctx: &AgentContext,
    to_user_id: &str,
    content: &str,
) -> Result<Value, ToolOutput> {
    let user_id = require_user(ctx)?;
    let pool = database(state)?;
    let sent = send_reply(pool, &user_id, to_user_id, content)
        .await
        .map_err(|e| ToolOutput::error(e.to_string()))?;
    Ok(to_json(&sent))
}
