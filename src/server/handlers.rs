//! Request handlers for the dashboard API

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::ingest::{FetchOptions, StorageError, TriggerOutcome};
use crate::server::AppState;

/// Storage faults map to a 500 with a JSON error body; retrying is the
/// client's call.
#[derive(Debug)]
pub struct ApiError(StorageError);

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

/// GET / - minimal landing page; the full dashboard is a separate client
pub async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Lifelog Ingestion Service</title></head>
<body>
  <h1>Lifelog Ingestion Service</h1>
  <p>The server is running. Available endpoints:</p>
  <ul>
    <li><strong>GET /api/status</strong> - service status and stats</li>
    <li><strong>GET /api/lifelogs</strong> - stored lifelogs with pagination</li>
    <li><strong>POST /api/ingest</strong> - trigger manual ingestion</li>
    <li><strong>GET /api/unparsed</strong> - entries not yet consumed downstream</li>
    <li><strong>POST /api/mark-parsed/{id}</strong> - mark an entry consumed</li>
  </ul>
</body>
</html>"#,
    )
}

/// GET /api/status - stats recomputed from storage on every call
pub async fn status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.store.compute_stats().await?;
    Ok(Json(json!({
        "status": "running",
        "stats": stats,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/lifelogs?limit&offset
pub async fn list_lifelogs(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state
        .store
        .list_records(page.limit.unwrap_or(20), page.offset.unwrap_or(0))
        .await?;
    Ok(Json(json!({ "entries": entries })))
}

/// POST /api/ingest - fire-and-forget manual trigger
///
/// Answers 202 before the run completes; its outcome is only observable via
/// logs and later status queries. A trigger while a run is in flight gets a
/// 409 instead of a second concurrent run.
pub async fn trigger_ingest(
    State(state): State<AppState>,
    body: Option<Json<FetchOptions>>,
) -> impl IntoResponse {
    let options = body.map(|Json(o)| o).unwrap_or_default();
    log::info!("Manual ingestion triggered with options: {:?}", options);

    match state.scheduler.trigger(options).await {
        TriggerOutcome::Started => (
            StatusCode::ACCEPTED,
            Json(json!({"status": "ingestion_started"})),
        ),
        TriggerOutcome::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(json!({"status": "already_running"})),
        ),
    }
}

/// GET /api/unparsed
pub async fn list_unparsed(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state.store.list_unparsed().await?;
    Ok(Json(json!({ "entries": entries })))
}

/// POST /api/mark-parsed/{id}
pub async fn mark_parsed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if state.store.mark_parsed(&id).await? {
        Ok(Json(json!({
            "status": "success",
            "message": format!("Entry {} marked as parsed", id),
        }))
        .into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Entry {} not found", id)})),
        )
            .into_response())
    }
}
