//! Service configuration from environment variables

use std::env;

/// Configuration for the ingestion service
///
/// Loaded from environment variables with sensible defaults. A `.env` file
/// is honored when present (loaded by the binary before this runs).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Limitless API key, sent as the X-API-Key header
    pub api_key: String,

    /// Base URL of the upstream API
    pub api_base_url: String,

    /// Path to the SQLite database file
    pub db_path: String,

    /// Seconds between scheduled ingestion runs
    pub ingest_interval_secs: u64,

    /// Whether to start the HTTP API server
    pub enable_server: bool,

    /// Preferred listen port for the HTTP server
    pub port: u16,

    /// Timezone forwarded upstream when a request does not specify one
    pub timezone: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LIMITLESS_API_KEY` (default: empty)
    /// - `LIMITLESS_API_URL` (default: https://api.limitless.ai)
    /// - `DB_PATH` (default: ./data/limitless.db)
    /// - `INGESTION_INTERVAL_SECS` (default: 1800)
    /// - `ENABLE_SERVER` (default: true)
    /// - `PORT` (default: 3000)
    /// - `LIMITLESS_TIMEZONE` (default: UTC)
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("LIMITLESS_API_KEY").unwrap_or_default(),

            api_base_url: env::var("LIMITLESS_API_URL")
                .unwrap_or_else(|_| "https://api.limitless.ai".to_string()),

            db_path: env::var("DB_PATH").unwrap_or_else(|_| "./data/limitless.db".to_string()),

            ingest_interval_secs: env::var("INGESTION_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_800),

            enable_server: env::var("ENABLE_SERVER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),

            port: env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(3000),

            timezone: env::var("LIMITLESS_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
        }
    }
}
