//! Lifeflow runtime
//!
//! Wires configuration, storage, the upstream client, the scheduler, and the
//! HTTP server together:
//! - Initializes the SQLite store (fatal on failure - no traffic without a
//!   working store)
//! - Starts the recurring ingestion scheduler; its first tick runs at once
//! - Starts the HTTP API server unless disabled
//! - On CTRL+C, cancels future ticks and lets an in-flight run finish
//!
//! Environment variables (see `ingest::config`):
//!   LIMITLESS_API_KEY        - upstream API key
//!   LIMITLESS_API_URL        - upstream base URL
//!   DB_PATH                  - SQLite database path (default: ./data/limitless.db)
//!   INGESTION_INTERVAL_SECS  - seconds between scheduled runs (default: 1800)
//!   ENABLE_SERVER / PORT     - HTTP server switch and preferred port

use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::time::Duration;

use lifeflow::ingest::{
    AppConfig, IngestionEngine, IngestionScheduler, LimitlessClient, SqliteStore,
};
use lifeflow::server::{start_server, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    info!(
        "Environment loaded: LIMITLESS_API_KEY={}, DB_PATH={}, PORT={}",
        if config.api_key.is_empty() { "No" } else { "Yes" },
        config.db_path,
        config.port
    );

    if config.api_key.is_empty() {
        warn!("LIMITLESS_API_KEY is not set, upstream requests will be rejected");
    }

    // Database initialization failure is fatal at startup
    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    info!("✅ Database initialized successfully");

    let client = Arc::new(LimitlessClient::new(&config.api_base_url, &config.api_key)?);
    let engine = Arc::new(IngestionEngine::new(
        client,
        store.clone(),
        config.timezone.clone(),
    ));

    // The scheduler's first tick fires immediately, giving the initial fetch
    let scheduler = Arc::new(IngestionScheduler::new(engine));
    scheduler
        .clone()
        .start(Duration::from_secs(config.ingest_interval_secs));

    if config.enable_server {
        let state = AppState {
            store,
            scheduler: scheduler.clone(),
        };
        let port = config.port;
        tokio::spawn(async move {
            if let Err(e) = start_server(state, port).await {
                error!("Error starting server: {}", e);
            }
        });
    } else {
        info!("HTTP server disabled (ENABLE_SERVER=false)");
    }

    info!("🔄 Press CTRL+C to shutdown gracefully");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, stopping services..."),
        Err(e) => error!("Failed to listen for CTRL+C: {}", e),
    }

    // Stop future ticks; an in-flight ingestion run finishes first
    scheduler.stop().await;

    info!("All services stopped, exiting process");
    Ok(())
}
