//! HTTP client for the Zep memory-graph API (v2).
//!
//! A short fixed timeout keeps a slow memory service from holding up a chat
//! response. There is no retry: a failed call is reported once and the caller
//! falls back to an empty result.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::memory::{FactEdge, MemoryError, MemoryService};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const THREAD_SOURCE: &str = "fractional-copilot";

#[derive(Debug, Serialize)]
struct GraphSearchRequest<'a> {
    user_id: &'a str,
    query: &'a str,
    limit: usize,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphSearchResponse {
    #[serde(default)]
    edges: Vec<FactEdge>,
}

#[derive(Clone)]
pub struct ZepClient {
    client: Client,
    base_url: String,
}

impl ZepClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, MemoryError> {
        Self::build(api_key, base_url, REQUEST_TIMEOUT)
    }

    #[cfg(test)]
    pub fn with_timeout(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, MemoryError> {
        Self::build(api_key, base_url, timeout)
    }

    fn build(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MemoryError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Api-Key {api_key}"))
            .map_err(|e| MemoryError::Config(format!("bad API key header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs and only logs a non-success status; used for the idempotent
    /// "create if missing" calls, where "already exists" is expected.
    async fn post_lenient(&self, path: &str, body: serde_json::Value) -> Result<(), MemoryError> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        if !response.status().is_success() {
            debug!("Memory service {path} returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryService for ZepClient {
    async fn search_facts(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactEdge>, MemoryError> {
        let response = self
            .client
            .post(self.url("/api/v2/graph/search"))
            .json(&GraphSearchRequest {
                user_id,
                query,
                limit,
                scope: "edges",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphSearchResponse = response.json().await?;
        Ok(parsed.edges)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        user_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), MemoryError> {
        self.post_lenient("/api/v2/users", json!({ "user_id": user_id }))
            .await?;
        self.post_lenient(
            "/api/v2/threads",
            json!({
                "thread_id": thread_id,
                "user_id": user_id,
                "metadata": { "source": THREAD_SOURCE },
            }),
        )
        .await?;

        let response = self
            .client
            .post(self.url(&format!("/api/v2/threads/{thread_id}/messages")))
            .json(&json!({ "messages": [{ "role": role, "content": content }] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{build_context, ProfileField};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_non_200_fails_open() {
        let app = Router::new().route(
            "/api/v2/graph/search",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let addr = serve(app).await;
        let client = ZepClient::new("test-key", &format!("http://{addr}")).unwrap();

        let err = client.search_facts("u1", "anything", 10).await.unwrap_err();
        assert!(matches!(err, MemoryError::Status { status: 503, .. }));

        let ctx = build_context(Some(&client as &dyn MemoryService), Some("u1")).await;
        assert!(!ctx.complete);
        assert_eq!(ctx.missing, ProfileField::ALL.to_vec());
        assert!(ctx.facts.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_service_times_out_and_fails_open() {
        let app = Router::new().route(
            "/api/v2/graph/search",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Json(json!({ "edges": [] }))
            }),
        );
        let addr = serve(app).await;
        let client =
            ZepClient::with_timeout("test-key", &format!("http://{addr}"), Duration::from_millis(200))
                .unwrap();

        let err = client.search_facts("u1", "q", 10).await.unwrap_err();
        assert!(matches!(err, MemoryError::Http(ref e) if e.is_timeout()));

        let ctx = tokio::time::timeout(
            Duration::from_secs(5),
            build_context(Some(&client as &dyn MemoryService), Some("u1")),
        )
        .await
        .expect("context built within the request timeout");
        assert!(!ctx.complete);
        assert_eq!(ctx.missing, ProfileField::ALL.to_vec());
        assert!(ctx.facts.is_empty());
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_search_parses_edges() {
        let app = Router::new().route(
            "/api/v2/graph/search",
            post(|| async {
                Json(json!({
                    "edges": [
                        { "fact": "Jane is based in London", "score": 0.9 },
                        { "fact": "Jane wants CFO roles" },
                        { "score": 0.1 }
                    ]
                }))
            }),
        );
        let addr = serve(app).await;
        let client = ZepClient::new("test-key", &format!("http://{addr}/")).unwrap();

        let edges = client.search_facts("u1", "q", 10).await.unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].score, Some(0.9));

        let ctx = build_context(Some(&client as &dyn MemoryService), Some("u1")).await;
        assert_eq!(ctx.facts.len(), 2);
        assert_eq!(ctx.missing, vec![ProfileField::Experience]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        // nothing listens on port 1
        let client = ZepClient::new("k", "http://127.0.0.1:1").unwrap();
        assert!(client.search_facts("u1", "q", 5).await.is_err());
        assert!(client.append_message("t", "u1", "user", "hi").await.is_err());
    }

    #[test]
    fn test_bad_api_key_header_is_config_error() {
        let err = ZepClient::new("bad\nkey", "http://x").err().unwrap();
        assert!(matches!(err, MemoryError::Config(_)));
    }
}
