//! # Lifelog ingestion pipeline
//!
//! Pulls timestamped lifelog records from the Limitless API on a schedule
//! and persists new ones into a local SQLite store.
//!
//! Flow: the scheduler claims its single execution slot and invokes the
//! engine; the engine asks the store for the latest known timestamp,
//! computes a fetch window with a one-day overlap, fetches a batch from the
//! upstream client, and upserts each record if absent. The overlap plus
//! insert-if-absent storage makes every pass idempotent and safe to re-run.
//!
//! ## Module Organization
//!
//! - `types` - Upstream and persisted data shapes
//! - `error` - `FetchError` / `StorageError` / `IngestionError` taxonomy
//! - `config` - Environment-driven service configuration
//! - `store` - `LifelogStore` trait and the SQLite backend
//! - `client` - `LifelogSource` trait and the Limitless API client
//! - `engine` - Window selection and the fetch-and-store pass
//! - `scheduler` - Recurring and manual triggers, serialized runs

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use client::{LifelogSource, LimitlessClient};
pub use config::AppConfig;
pub use engine::IngestionEngine;
pub use error::{FetchError, IngestionError, StorageError};
pub use scheduler::{IngestionScheduler, TriggerOutcome};
pub use store::{LifelogStore, SqliteStore};
pub use types::{
    ContentItem, DatabaseStats, FetchOptions, IngestionSummary, LifelogEntry, LifelogRecord,
};
