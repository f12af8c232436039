//! Error taxonomy for the ingestion pipeline
//!
//! `FetchError` covers the upstream API, `StorageError` the persistence
//! layer, and `IngestionError` wraps either while carrying the partial tally
//! accumulated before the failure. Already-stored rows are never rolled
//! back; the pipeline is idempotent and safe to re-run.

use thiserror::Error;

use super::types::IngestionSummary;

/// Upstream API failure (network, auth, rate limit).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-success HTTP status from the upstream API
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Request never produced a response (timeout, DNS, connection refused)
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Upstream HTTP status code, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// Persistence engine failure. Callers decide retry policy; the store never
/// retries internally.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare storage location: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A failed ingestion pass. Rows stored before the failure remain stored.
#[derive(Debug, Error)]
#[error("ingestion failed after storing {} entries ({} skipped): {source}", tally.stored, tally.skipped)]
pub struct IngestionError {
    /// Entries processed before the failure
    pub tally: IngestionSummary,
    #[source]
    pub source: IngestionFailure,
}

#[derive(Debug, Error)]
pub enum IngestionFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestionError {
    pub fn new(tally: IngestionSummary, source: impl Into<IngestionFailure>) -> Self {
        Self {
            tally,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingestion_error_reports_partial_tally() {
        let err = IngestionError::new(
            IngestionSummary {
                stored: 3,
                skipped: 2,
            },
            StorageError::Database(rusqlite::Error::InvalidQuery),
        );

        let message = err.to_string();
        assert!(message.contains("storing 3 entries"));
        assert!(message.contains("2 skipped"));
    }

    #[test]
    fn test_fetch_error_exposes_status_code() {
        let err = FetchError::Status {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.status(), Some(429));
    }
}
