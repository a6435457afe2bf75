mod agent;
mod chat;
mod config;
mod db;
mod errors;
mod identity;
mod jobs;
mod llm_client;
mod memory;
mod messaging;
mod models;
mod preferences;
mod routes;
mod state;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::LlmClient;
use crate::memory::{MemoryService, ZepClient};
use crate::preferences::store::{PgProfileStore, ProfileStore};
use crate::routes::build_router;
use crate::state::{AppState, Backend};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fractional agent v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL: jobs, messages and the profile store share one pool
    let (db, profiles): (Backend<PgPool>, Backend<dyn ProfileStore>) = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)?;
            let schema_pool = pool.clone();
            tokio::spawn(async move { ensure_schema(&schema_pool).await });
            (
                Backend::Available(Arc::new(pool.clone())),
                Backend::Available(Arc::new(PgProfileStore::new(pool))),
            )
        }
        None => {
            warn!("DATABASE_URL not set; jobs, messages and profile storage disabled");
            (
                Backend::Unavailable("Database not configured"),
                Backend::Unavailable("Database not configured"),
            )
        }
    };

    // Memory graph service
    let memory: Backend<dyn MemoryService> = match &config.zep_api_key {
        Some(key) => match ZepClient::new(key, &config.zep_base_url) {
            Ok(client) => {
                info!("Memory service client initialized ({})", config.zep_base_url);
                Backend::Available(Arc::new(client))
            }
            Err(e) => {
                warn!("Memory service disabled: {e}");
                Backend::Unavailable("Memory service misconfigured")
            }
        },
        None => {
            warn!("ZEP_API_KEY not set; conversation memory disabled");
            Backend::Unavailable("Memory service not configured")
        }
    };

    // LLM client
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Backend::Available(Arc::new(client))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; chat answers with fallback text");
            Backend::Unavailable("LLM not configured")
        }
    };

    let state = AppState {
        db,
        profiles,
        memory,
        llm,
    };

    // The voice gateway and the widget are served from other origins
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
