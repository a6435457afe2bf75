use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Creates a PostgreSQL connection pool without touching the network.
/// Connections are opened on first use, so an unreachable database degrades
/// individual requests instead of aborting startup.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Configuring PostgreSQL pool (lazy connect)...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(database_url)?;

    Ok(pool)
}

/// Creates the profile items table if it does not exist yet.
/// The rest of the schema (jobs, messages, user_types) is owned elsewhere.
pub async fn ensure_schema(pool: &PgPool) {
    let result = sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profile_items (
            id SERIAL PRIMARY KEY,
            user_id TEXT NOT NULL,
            item_type TEXT NOT NULL,
            value TEXT NOT NULL,
            metadata JSONB DEFAULT '{}',
            confirmed BOOLEAN DEFAULT false,
            created_at TIMESTAMPTZ DEFAULT NOW(),
            updated_at TIMESTAMPTZ DEFAULT NOW(),
            UNIQUE(user_id, item_type, value)
        )
        "#,
    )
    .execute(pool)
    .await;

    match result {
        Ok(_) => info!("Profile items table ready"),
        Err(e) => warn!("Could not ensure profile items table: {e}"),
    }
}
