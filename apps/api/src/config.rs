use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base URL of the identity-management service admin API.
    pub identity_api_url: String,
    /// Privileged service key. Identity deletion and unrestricted resource
    /// deletion require it; when absent the delete-account endpoint answers
    /// service-unavailable.
    pub identity_service_key: Option<String>,
    /// Public anon key used by user-scoped clients elsewhere in the platform.
    #[allow(dead_code)]
    pub identity_anon_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            identity_api_url: require_env("IDENTITY_API_URL")?,
            identity_service_key: optional_env("IDENTITY_SERVICE_KEY"),
            identity_anon_key: optional_env("IDENTITY_ANON_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
