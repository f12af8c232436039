//! HTTP API server
//!
//! Thin request/response mapping over the store and scheduler. The preferred
//! port may be taken by another process; the original deployment expects the
//! service to fall back through a fixed list before giving up.

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::ingest::{IngestionScheduler, LifelogStore};

/// Ports tried in order when the preferred one is already in use.
const FALLBACK_PORTS: [u16; 5] = [3001, 3002, 8080, 8081, 8082];

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LifelogStore>,
    pub scheduler: Arc<IngestionScheduler>,
}

/// Create the application router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::status))
        .route("/api/lifelogs", get(handlers::list_lifelogs))
        .route("/api/ingest", post(handlers::trigger_ingest))
        .route("/api/unparsed", get(handlers::list_unparsed))
        .route("/api/mark-parsed/{id}", post(handlers::mark_parsed))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the preferred port, falling back through `FALLBACK_PORTS` on
/// contention. Any other bind error is returned as-is.
async fn bind_with_fallback(preferred: u16) -> std::io::Result<TcpListener> {
    match TcpListener::bind(("0.0.0.0", preferred)).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            log::warn!("Port {} is already in use, trying alternative ports", preferred);
            for port in FALLBACK_PORTS {
                match TcpListener::bind(("0.0.0.0", port)).await {
                    Ok(listener) => return Ok(listener),
                    Err(e) if e.kind() == ErrorKind::AddrInUse => {
                        log::warn!("Alternative port {} is also in use", port);
                    }
                    Err(e) => return Err(e),
                }
            }
            log::error!("Could not bind server on any port");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Start the HTTP server and serve until the process exits.
pub async fn start_server(state: AppState, preferred_port: u16) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = bind_with_fallback(preferred_port).await?;
    log::info!("🌐 Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
