//! Core data types shared between the API client, the store, and the server
//!
//! Two shapes exist for a lifelog: `LifelogEntry` is what the upstream API
//! returns (loosely structured, extra fields allowed), `LifelogRecord` is the
//! row we persist (strongly typed, with the original payload kept verbatim
//! in `raw_data` for forward compatibility).

use serde::{Deserialize, Serialize};

/// One lifelog as returned by the Limitless API.
///
/// The upstream schema is permissive, so any fields we do not model are
/// captured in `extra` and survive the round-trip into `raw_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifelogEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Structured sub-element of a lifelog (speaker turn, transcript segment).
///
/// Children nest recursively; only top-level items get their own rows in
/// `lifelog_contents`, nested ones stay reachable through `raw_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(rename = "startOffsetMs", skip_serializing_if = "Option::is_none")]
    pub start_offset_ms: Option<i64>,
    #[serde(rename = "endOffsetMs", skip_serializing_if = "Option::is_none")]
    pub end_offset_ms: Option<i64>,
    #[serde(rename = "speakerName", skip_serializing_if = "Option::is_none")]
    pub speaker_name: Option<String>,
    #[serde(rename = "speakerIdentifier", skip_serializing_if = "Option::is_none")]
    pub speaker_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentItem>,
}

/// Persisted lifelog row.
///
/// Immutable after first insert except for `is_parsed`/`parsed_at`, which a
/// downstream consumer may flip via `mark_parsed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifelogRecord {
    pub id: String,
    pub title: String,
    pub markdown: String,
    pub raw_data: String,
    pub created_at: String,
    pub ingested_at: String,
    pub is_parsed: bool,
    pub parsed_at: Option<String>,
}

/// Query window sent upstream. All bounds optional; date-only strings are
/// interpreted in `timezone` by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Aggregate counts computed fresh from storage on every status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total: i64,
    pub parsed: i64,
    pub unparsed: i64,
    pub latest: Option<String>,
}

/// Tally returned by one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    /// Entries newly inserted this pass
    pub stored: usize,
    /// Entries skipped because a row with the same id already existed
    pub skipped: usize,
}
