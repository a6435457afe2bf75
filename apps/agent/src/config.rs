use anyhow::{Context, Result};

const DEFAULT_ZEP_BASE_URL: &str = "https://api.getzep.com";

/// Application configuration loaded from environment variables.
/// Every external dependency is optional; a missing value switches the
/// matching feature into its "unavailable" branch instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub zep_api_key: Option<String>,
    pub zep_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            zep_api_key: optional_env("ZEP_API_KEY"),
            zep_base_url: optional_env("ZEP_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ZEP_BASE_URL.to_string()),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an env var, treating empty or whitespace-only values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
