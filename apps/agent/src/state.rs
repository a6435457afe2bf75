use std::sync::Arc;

use sqlx::PgPool;

use crate::llm_client::LlmClient;
use crate::memory::MemoryService;
use crate::preferences::store::ProfileStore;

/// An external dependency that may be missing at runtime.
/// Callers branch on the variant instead of failing the request.
pub enum Backend<T: ?Sized> {
    Available(Arc<T>),
    Unavailable(&'static str),
}

impl<T: ?Sized> Backend<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Backend::Available(inner) => Some(inner.as_ref()),
            Backend::Unavailable(_) => None,
        }
    }

    /// Human-readable reason, used in tool results and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Backend::Available(_) => "available",
            Backend::Unavailable(reason) => reason,
        }
    }
}

impl<T: ?Sized> Clone for Backend<T> {
    fn clone(&self) -> Self {
        match self {
            Backend::Available(inner) => Backend::Available(Arc::clone(inner)),
            Backend::Unavailable(reason) => Backend::Unavailable(reason),
        }
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Jobs, messages and user_types queries.
    pub db: Backend<PgPool>,
    pub profiles: Backend<dyn ProfileStore>,
    pub memory: Backend<dyn MemoryService>,
    pub llm: Backend<LlmClient>,
}

impl AppState {
    /// State with every external dependency switched off.
    #[cfg(test)]
    pub fn offline() -> Self {
        AppState {
            db: Backend::Unavailable("Database not configured"),
            profiles: Backend::Unavailable("Database not configured"),
            memory: Backend::Unavailable("Memory service not configured"),
            llm: Backend::Unavailable("LLM not configured"),
        }
    }
}
