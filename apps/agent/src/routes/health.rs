use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service status plus which backends this instance was started with.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "fractional-agent",
        "backends": {
            "database": state.db.reason(),
            "memory": state.memory.reason(),
            "llm": state.llm.reason(),
        }
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::build_router;

    #[tokio::test]
    async fn test_health_reports_unavailable_backends() {
        for uri in ["/", "/health"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = build_router(AppState::offline()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["service"], "fractional-agent");
            assert_eq!(body["backends"]["database"], "Database not configured");
            assert_eq!(body["backends"]["llm"], "LLM not configured");
        }
    }
}
