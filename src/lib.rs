//! Lifeflow - lifelog ingestion service
//!
//! Periodically pulls timestamped lifelog records from the Limitless API,
//! persists new ones into SQLite, and exposes the accumulated data through
//! a small read/write HTTP API.

pub mod ingest;
pub mod server;
