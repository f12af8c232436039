//! Storage capability for lifelog records
//!
//! The `LifelogStore` trait is the seam between the ingestion engine / HTTP
//! layer and the concrete storage engine. `SqliteStore` is the default
//! backend; the binary picks one at startup (plain dependency injection, no
//! global switch).

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::error::StorageError;
use super::types::{DatabaseStats, LifelogEntry, LifelogRecord};

/// Trait for persisting and querying lifelog records
///
/// Tables owned by the implementation:
/// - `lifelogs` - one row per record, keyed by the upstream id
/// - `lifelog_contents` - child rows of structured content items
#[async_trait]
pub trait LifelogStore: Send + Sync {
    /// Store the entry only if no record with its id exists.
    ///
    /// Returns true when newly stored, false when a row with the same id was
    /// already present. The id uniqueness constraint decides the winner
    /// between concurrent callers; losers observe false. Content items are
    /// written in the same transaction as the record.
    async fn upsert_if_absent(&self, entry: &LifelogEntry) -> Result<bool, StorageError>;

    /// Maximum `created_at` among stored records, or None when empty.
    /// Seeds the next fetch window.
    async fn latest_created_at(&self) -> Result<Option<String>, StorageError>;

    /// Records ordered by `created_at` descending, paginated.
    async fn list_records(&self, limit: i64, offset: i64)
        -> Result<Vec<LifelogRecord>, StorageError>;

    /// Records not yet consumed downstream, `created_at` ascending.
    async fn list_unparsed(&self) -> Result<Vec<LifelogRecord>, StorageError>;

    /// Set `is_parsed = 1, parsed_at = now` on the matching row.
    /// Returns whether a row was affected.
    async fn mark_parsed(&self, id: &str) -> Result<bool, StorageError>;

    /// Aggregate counts computed from current storage state.
    async fn compute_stats(&self) -> Result<DatabaseStats, StorageError>;
}

/// Idempotent schema, applied on every open.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS lifelogs (
    id          TEXT PRIMARY KEY,
    title       TEXT,
    markdown    TEXT,
    raw_data    TEXT,
    created_at  TEXT,
    ingested_at TEXT DEFAULT CURRENT_TIMESTAMP,
    is_parsed   INTEGER DEFAULT 0,
    parsed_at   TEXT DEFAULT NULL
);

CREATE TABLE IF NOT EXISTS lifelog_contents (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    lifelog_id         TEXT,
    type               TEXT,
    content            TEXT,
    start_time         TEXT,
    end_time           TEXT,
    start_offset_ms    INTEGER,
    end_offset_ms      INTEGER,
    speaker_name       TEXT,
    speaker_identifier TEXT,
    FOREIGN KEY (lifelog_id) REFERENCES lifelogs(id)
);

CREATE INDEX IF NOT EXISTS idx_lifelogs_created_at ON lifelogs(created_at);
CREATE INDEX IF NOT EXISTS idx_contents_lifelog_id ON lifelog_contents(lifelog_id);
"#;

/// SQLite implementation of `LifelogStore`
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    ///
    /// Creates the parent directory when missing. Failure here is fatal for
    /// the process; the service must not accept traffic without a store.
    pub fn open(db_path: &str) -> Result<Self, StorageError> {
        if let Some(dir) = Path::new(db_path).parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                log::info!("Creating data directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        log::info!("SQLite database initialized at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LifelogRecord> {
        Ok(LifelogRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            markdown: row.get(2)?,
            raw_data: row.get(3)?,
            created_at: row.get(4)?,
            ingested_at: row.get(5)?,
            is_parsed: row.get::<_, i64>(6)? != 0,
            parsed_at: row.get(7)?,
        })
    }
}

const RECORD_COLUMNS: &str =
    "id, title, markdown, raw_data, created_at, ingested_at, is_parsed, parsed_at";

#[async_trait]
impl LifelogStore for SqliteStore {
    async fn upsert_if_absent(&self, entry: &LifelogEntry) -> Result<bool, StorageError> {
        let raw_data = serde_json::to_string(entry)?;
        let now = Utc::now().to_rfc3339();
        let created_at = entry.created_at.clone().unwrap_or_else(|| now.clone());

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // INSERT OR IGNORE makes the primary key the arbiter: at most one
        // concurrent caller inserts, the rest see 0 changed rows.
        let inserted = tx.execute(
            r#"
            INSERT OR IGNORE INTO lifelogs (id, title, markdown, raw_data, created_at, ingested_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![entry.id, entry.title, entry.markdown, raw_data, created_at, now],
        )?;

        if inserted > 0 {
            // Content items live and die with their parent record
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO lifelog_contents (
                    lifelog_id, type, content, start_time, end_time,
                    start_offset_ms, end_offset_ms, speaker_name, speaker_identifier
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;

            for item in &entry.contents {
                stmt.execute(params![
                    entry.id,
                    item.item_type,
                    item.content,
                    item.start_time,
                    item.end_time,
                    item.start_offset_ms,
                    item.end_offset_ms,
                    item.speaker_name,
                    item.speaker_identifier,
                ])?;
            }
            drop(stmt);
        }

        tx.commit()?;
        Ok(inserted > 0)
    }

    async fn latest_created_at(&self) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let latest = conn
            .query_row(
                "SELECT created_at FROM lifelogs ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(latest)
    }

    async fn list_records(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LifelogRecord>, StorageError> {
        let conn = self.conn.lock().unwrap();
        // Secondary id ordering keeps pagination stable when records share a
        // created_at timestamp.
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM lifelogs
             ORDER BY created_at DESC, id ASC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![limit, offset], Self::record_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn list_unparsed(&self) -> Result<Vec<LifelogRecord>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM lifelogs
             WHERE is_parsed = 0 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map([], Self::record_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn mark_parsed(&self, id: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE lifelogs SET is_parsed = 1, parsed_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    async fn compute_stats(&self) -> Result<DatabaseStats, StorageError> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM lifelogs", [], |row| row.get(0))?;
        let parsed: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lifelogs WHERE is_parsed = 1",
            [],
            |row| row.get(0),
        )?;
        let latest: Option<String> = conn
            .query_row(
                "SELECT created_at FROM lifelogs ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(DatabaseStats {
            total,
            parsed,
            unparsed: total - parsed,
            latest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::ContentItem;
    use tempfile::NamedTempFile;

    fn make_entry(id: &str, created_at: &str) -> LifelogEntry {
        LifelogEntry {
            id: id.to_string(),
            title: format!("Entry {}", id),
            markdown: format!("# Entry {}", id),
            contents: Vec::new(),
            created_at: Some(created_at.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    fn make_content(text: &str, speaker: &str) -> ContentItem {
        ContentItem {
            item_type: "blockquote".to_string(),
            content: text.to_string(),
            start_time: None,
            end_time: None,
            start_offset_ms: Some(0),
            end_offset_ms: Some(1500),
            speaker_name: Some(speaker.to_string()),
            speaker_identifier: None,
            children: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        // Test: Same entry twice yields true then false, one stored copy
        let store = SqliteStore::open_in_memory().unwrap();
        let entry = make_entry("a", "2024-01-01T00:00:00Z");

        assert!(store.upsert_if_absent(&entry).await.unwrap());
        assert!(!store.upsert_if_absent(&entry).await.unwrap());

        let stats = store.compute_stats().await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        // Test: A later entry with the same id never overwrites the first
        let store = SqliteStore::open_in_memory().unwrap();

        let first = make_entry("a", "2024-01-01T00:00:00Z");
        store.upsert_if_absent(&first).await.unwrap();

        let mut second = make_entry("a", "2024-06-01T00:00:00Z");
        second.title = "Rewritten".to_string();
        assert!(!store.upsert_if_absent(&second).await.unwrap());

        let records = store.list_records(10, 0).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Entry a");
        assert_eq!(records[0].created_at, "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_content_items_stored_with_record() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut entry = make_entry("a", "2024-01-01T00:00:00Z");
        entry.contents = vec![make_content("hello", "Alice"), make_content("hi", "Bob")];
        store.upsert_if_absent(&entry).await.unwrap();

        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM lifelog_contents WHERE lifelog_id = ?1",
                ["a"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);

        let speaker: String = conn
            .query_row(
                "SELECT speaker_name FROM lifelog_contents WHERE lifelog_id = ?1 LIMIT 1",
                ["a"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(speaker, "Alice");
    }

    #[tokio::test]
    async fn test_duplicate_upsert_does_not_duplicate_contents() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut entry = make_entry("a", "2024-01-01T00:00:00Z");
        entry.contents = vec![make_content("hello", "Alice")];
        store.upsert_if_absent(&entry).await.unwrap();
        store.upsert_if_absent(&entry).await.unwrap();

        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM lifelog_contents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_latest_created_at() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.latest_created_at().await.unwrap(), None);

        store
            .upsert_if_absent(&make_entry("a", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .upsert_if_absent(&make_entry("b", "2024-01-03T00:00:00Z"))
            .await
            .unwrap();
        store
            .upsert_if_absent(&make_entry("c", "2024-01-02T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(
            store.latest_created_at().await.unwrap().as_deref(),
            Some("2024-01-03T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_list_records_descending_with_pagination() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 1..=5 {
            store
                .upsert_if_absent(&make_entry(
                    &format!("r{}", i),
                    &format!("2024-01-0{}T00:00:00Z", i),
                ))
                .await
                .unwrap();
        }

        let page1 = store.list_records(2, 0).await.unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, "r5");
        assert_eq!(page1[1].id, "r4");

        let page2 = store.list_records(2, 2).await.unwrap();
        assert_eq!(page2[0].id, "r3");
        assert_eq!(page2[1].id, "r2");
    }

    #[tokio::test]
    async fn test_mark_parsed_and_unparsed_listing() {
        // Test: mark_parsed flips the flag, sets parsed_at, reports misses
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_if_absent(&make_entry("a", "2024-01-02T00:00:00Z"))
            .await
            .unwrap();
        store
            .upsert_if_absent(&make_entry("b", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();

        // Unparsed listing is ascending by created_at
        let unparsed = store.list_unparsed().await.unwrap();
        assert_eq!(unparsed.len(), 2);
        assert_eq!(unparsed[0].id, "b");

        assert!(store.mark_parsed("a").await.unwrap());
        assert!(!store.mark_parsed("missing").await.unwrap());

        let unparsed = store.list_unparsed().await.unwrap();
        assert_eq!(unparsed.len(), 1);
        assert_eq!(unparsed[0].id, "b");

        let records = store.list_records(10, 0).await.unwrap();
        let a = records.iter().find(|r| r.id == "a").unwrap();
        assert!(a.is_parsed);
        assert!(a.parsed_at.is_some());
    }

    #[tokio::test]
    async fn test_stats_consistency() {
        // Test: total == parsed + unparsed, latest tracks max created_at
        let store = SqliteStore::open_in_memory().unwrap();

        let stats = store.compute_stats().await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.latest, None);

        for i in 1..=4 {
            store
                .upsert_if_absent(&make_entry(
                    &format!("s{}", i),
                    &format!("2024-02-0{}T00:00:00Z", i),
                ))
                .await
                .unwrap();
        }
        store.mark_parsed("s1").await.unwrap();
        store.mark_parsed("s2").await.unwrap();

        let stats = store.compute_stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.parsed, 2);
        assert_eq!(stats.unparsed, 2);
        assert_eq!(stats.total, stats.parsed + stats.unparsed);
        assert_eq!(stats.latest.as_deref(), Some("2024-02-04T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_open_creates_file_and_survives_reopen() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_if_absent(&make_entry("persisted", "2024-01-01T00:00:00Z"))
                .await
                .unwrap();
        }

        // Schema application is idempotent and data survives reopen
        let store = SqliteStore::open(&path).unwrap();
        let stats = store.compute_stats().await.unwrap();
        assert_eq!(stats.total, 1);
    }
}
