//! Ingestion engine - one fetch-and-store pass over the upstream source
//!
//! The central correctness property of the whole service lives here: the
//! default window always overlaps already-fetched time (latest entry minus
//! one day) and storage is insert-if-absent, so re-running a pass with an
//! overlapping window can never duplicate records. Failed passes keep what
//! they stored; nothing is rolled back.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::client::LifelogSource;
use super::error::IngestionError;
use super::store::LifelogStore;
use super::types::{FetchOptions, IngestionSummary};

/// Overlap subtracted from the latest stored timestamp when computing the
/// catch-up window. Guards against upstream records created out of order or
/// not yet visible during the previous fetch.
const CATCH_UP_OVERLAP_DAYS: i64 = 1;

/// Window used when the store is empty.
const BOOTSTRAP_WINDOW_DAYS: i64 = 7;

/// Compute the default window start as a date-only string.
///
/// With a latest stored timestamp: that timestamp minus one day. With an
/// empty store (or an unparseable timestamp): now minus seven days.
pub fn default_window_start(latest: Option<&str>, now: DateTime<Utc>) -> String {
    let anchor = latest.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| {
                log::warn!("Could not parse latest entry date '{}': {}", raw, e);
                e
            })
            .ok()
    });

    match anchor {
        Some(ts) => (ts - Duration::days(CATCH_UP_OVERLAP_DAYS))
            .format("%Y-%m-%d")
            .to_string(),
        None => (now - Duration::days(BOOTSTRAP_WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string(),
    }
}

/// Orchestrates window selection, fetch, and dedup-and-store
pub struct IngestionEngine {
    source: Arc<dyn LifelogSource>,
    store: Arc<dyn LifelogStore>,
    default_timezone: String,
}

impl IngestionEngine {
    pub fn new(
        source: Arc<dyn LifelogSource>,
        store: Arc<dyn LifelogStore>,
        default_timezone: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            default_timezone: default_timezone.into(),
        }
    }

    /// Run one ingestion pass and return the stored/skipped tally.
    ///
    /// When neither `date` nor `start` is given, the window is derived from
    /// the latest stored entry (see `default_window_start`). Errors carry the
    /// tally accumulated before the failure; already-stored rows stay stored.
    pub async fn run_ingestion(
        &self,
        mut options: FetchOptions,
    ) -> Result<IngestionSummary, IngestionError> {
        if options.date.is_none() && options.start.is_none() {
            let latest = self
                .store
                .latest_created_at()
                .await
                .map_err(|e| IngestionError::new(IngestionSummary::default(), e))?;

            let start = default_window_start(latest.as_deref(), Utc::now());
            match latest {
                Some(_) => log::info!("Fetching lifelogs since {} (based on latest entry)", start),
                None => log::info!("No existing entries found. Fetching lifelogs since {}", start),
            }
            options.start = Some(start);
        }

        if options.timezone.is_none() {
            options.timezone = Some(self.default_timezone.clone());
        }

        let entries = self
            .source
            .fetch_batch(&options)
            .await
            .map_err(|e| IngestionError::new(IngestionSummary::default(), e))?;

        let mut tally = IngestionSummary::default();
        for entry in &entries {
            match self.store.upsert_if_absent(entry).await {
                Ok(true) => tally.stored += 1,
                Ok(false) => tally.skipped += 1,
                Err(e) => {
                    log::error!("Error saving lifelog entry {}: {}", entry.id, e);
                    return Err(IngestionError::new(tally, e));
                }
            }
        }

        log::info!(
            "✅ Stored {} new lifelogs ({} already present)",
            tally.stored,
            tally.skipped
        );
        Ok(tally)
    }
}
