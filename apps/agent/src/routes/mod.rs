pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::preferences::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        // Voice gateway (OpenAI-compatible streaming)
        .route(
            "/chat/completions",
            post(chat::handle_completions).get(chat::handle_completions_probe),
        )
        // Web widget
        .route("/api/v1/chat", post(chat::handle_widget_chat))
        // Profile API
        .route(
            "/api/v1/profile/:user_id/items",
            get(profile::handle_list_items).delete(profile::handle_delete_item),
        )
        .route(
            "/api/v1/profile/:user_id/preferences",
            post(profile::handle_save_preference),
        )
        .route(
            "/api/v1/profile/:user_id/completeness",
            get(profile::handle_completeness),
        )
        .route("/api/v1/profile/:user_id/memory", get(profile::handle_memory))
        .with_state(state)
}
