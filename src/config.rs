//! Runtime configuration read from the environment
//!
//! `main` loads a `.env` file with `dotenvy` first, so every key below can
//! live there as well.
//!
//! - `PORT` - Server port number (default: 8080)
//! - `DATABASE_URL` - Path to database file (default: "data.db")
//! - `PUBLIC_HOST` - Host the service is reachable under; used for redirect
//!   loop detection and short URLs instead of the request's `Host` header
//! - `AUTHORIZATION` - Shared secret required on `/api` requests when set
//! - `IDENTITY_HEADER` - Header carrying the authenticated user's email,
//!   set by a trusted proxy in front of the service
//! - `ENRICHMENT_URL` - Metadata lookup endpoint; enrichment is off when unset
//! - `ENRICHMENT_TIMEOUT_MS` - Upper bound on one lookup (default: 2000)
//! - `RECENT_LIMIT` - Number of past links shown on the index (default: 100)

use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: String,
    pub public_host: Option<String>,
    pub api_secret: Option<String>,
    pub identity_header: Option<String>,
    pub enrichment_url: Option<String>,
    pub enrichment_timeout: Duration,
    pub recent_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: "data.db".to_string(),
            public_host: None,
            api_secret: None,
            identity_header: None,
            enrichment_url: None,
            enrichment_timeout: Duration::from_millis(2000),
            recent_limit: 100,
        }
    }
}

impl AppConfig {
    /// Builds the configuration from environment variables, falling back to
    /// [`AppConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_or("PORT", defaults.port),
            database_path: non_empty("DATABASE_URL").unwrap_or(defaults.database_path),
            public_host: non_empty("PUBLIC_HOST"),
            api_secret: non_empty("AUTHORIZATION"),
            identity_header: non_empty("IDENTITY_HEADER"),
            enrichment_url: non_empty("ENRICHMENT_URL"),
            enrichment_timeout: Duration::from_millis(parse_or(
                "ENRICHMENT_TIMEOUT_MS",
                defaults.enrichment_timeout.as_millis() as u64,
            )),
            recent_limit: parse_or("RECENT_LIMIT", defaults.recent_limit),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match non_empty(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unparsable config value, using default");
            default
        }),
        None => default,
    }
}
