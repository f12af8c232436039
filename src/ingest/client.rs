//! Limitless API client
//!
//! Fetches lifelog batches for a time window, following the cursor in
//! `meta.lifelogs.nextCursor` until the upstream has no more pages.
//!
//! Failure policy: network/auth/rate-limit problems surface as `FetchError`
//! so the caller can decide about retries. A response that parses but does
//! not have the expected shape is treated as "no data this round" - an empty
//! batch is safe for the idempotent upsert loop downstream.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::error::FetchError;
use super::types::{FetchOptions, LifelogEntry};

/// Request timeout so a hung upstream cannot occupy the scheduler's single
/// execution slot forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for the upstream lifelog source
///
/// The ingestion engine only depends on this seam; tests substitute a mock.
#[async_trait]
pub trait LifelogSource: Send + Sync {
    /// Fetch all lifelogs whose creation time falls in the window.
    async fn fetch_batch(&self, options: &FetchOptions) -> Result<Vec<LifelogEntry>, FetchError>;

    /// Point lookup by id. Not on the ingestion path; used by verification
    /// tooling.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<LifelogEntry>, FetchError>;
}

/// Envelope the Limitless API wraps every response in
#[derive(Debug, Default, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default)]
    meta: Option<ApiMeta>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiData {
    #[serde(default)]
    lifelogs: Option<Vec<LifelogEntry>>,
    #[serde(default)]
    lifelog: Option<LifelogEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMeta {
    #[serde(default)]
    lifelogs: Option<ApiMetaLifelogs>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMetaLifelogs {
    #[serde(rename = "nextCursor")]
    next_cursor: Option<String>,
}

/// HTTP client for the Limitless API
pub struct LimitlessClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LimitlessClient {
    /// Build a client against `base_url`, authenticating with `api_key`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_envelope(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<ApiEnvelope>, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                log::warn!("Received unexpected response format from Limitless API: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl LifelogSource for LimitlessClient {
    async fn fetch_batch(&self, options: &FetchOptions) -> Result<Vec<LifelogEntry>, FetchError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(date) = &options.date {
                query.push(("date", date.clone()));
            }
            if let Some(start) = &options.start {
                query.push(("start", start.clone()));
            }
            if let Some(end) = &options.end {
                query.push(("end", end.clone()));
            }
            if let Some(timezone) = &options.timezone {
                query.push(("timezone", timezone.clone()));
            }
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.clone()));
            }

            log::info!("Fetching lifelogs with params: {:?}", query);

            let Some(envelope) = self.get_envelope("/v1/lifelogs", &query).await? else {
                break;
            };

            let Some(page) = envelope.data.and_then(|d| d.lifelogs) else {
                log::warn!("Lifelogs missing from Limitless API response, treating as empty");
                break;
            };

            log::info!("Fetched {} lifelogs from Limitless API", page.len());
            all.extend(page);

            cursor = envelope
                .meta
                .and_then(|m| m.lifelogs)
                .and_then(|l| l.next_cursor)
                .filter(|c| !c.is_empty());

            if cursor.is_none() {
                break;
            }
        }

        Ok(all)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<LifelogEntry>, FetchError> {
        log::info!("Fetching lifelog with ID: {}", id);

        let result = self.get_envelope(&format!("/v1/lifelogs/{}", id), &[]).await;
        match result {
            Ok(Some(envelope)) => Ok(envelope.data.and_then(|d| d.lifelog)),
            Ok(None) => Ok(None),
            Err(FetchError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
