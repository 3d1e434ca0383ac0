//! Content cache: last-synced content hash per file.
//!
//! The cache is advisory. Sync consults it to skip unchanged files; if an
//! entry is missing or the table is emptied, sync falls back to comparing
//! against the item row and the catalog heals itself on the next run.

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_path: String,
    pub content_hash: String,
    /// Unix milliseconds.
    pub date_added: i64,
    /// Unix milliseconds; `None` until the first content change.
    pub date_updated: Option<i64>,
}

impl CacheEntry {
    /// Most recent time the cached hash was written.
    #[must_use]
    pub fn last_synced(&self) -> i64 {
        self.date_updated.unwrap_or(self.date_added)
    }
}

/// Look up a file's entry. A missing entry is `None`, not an error.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get(conn: &Connection, file_path: &str) -> Result<Option<CacheEntry>> {
    let entry = conn
        .query_row(
            "SELECT file_path, content_hash, date_added, date_updated FROM cache WHERE file_path = ?1",
            [file_path],
            map_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Record a newly added file.
///
/// Idempotent: re-adding a known file refreshes its hash.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn add(conn: &Connection, file_path: &str, content_hash: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO cache (file_path, content_hash, date_added, date_updated)
         VALUES (?1, ?2, ?3, NULL)
         ON CONFLICT(file_path) DO UPDATE SET
            content_hash = excluded.content_hash,
            date_updated = excluded.date_added",
        params![file_path, content_hash, now],
    )?;
    Ok(())
}

/// Record a changed file, keeping its original `date_added`.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn update(conn: &Connection, file_path: &str, content_hash: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO cache (file_path, content_hash, date_added, date_updated)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(file_path) DO UPDATE SET
            content_hash = excluded.content_hash,
            date_updated = excluded.date_updated",
        params![file_path, content_hash, now],
    )?;
    Ok(())
}

/// Forget a file.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn remove(conn: &Connection, file_path: &str) -> Result<()> {
    conn.execute("DELETE FROM cache WHERE file_path = ?1", [file_path])?;
    Ok(())
}

/// All entries, optionally restricted to a path prefix (e.g. `book/`).
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list(conn: &Connection, prefix: Option<&str>) -> Result<Vec<CacheEntry>> {
    let pattern = format!("{}%", prefix.unwrap_or_default().replace('%', "\\%"));
    let mut stmt = conn.prepare(
        "SELECT file_path, content_hash, date_added, date_updated FROM cache
         WHERE file_path LIKE ?1 ESCAPE '\\' ORDER BY file_path",
    )?;
    let rows = stmt.query_map([pattern], map_entry)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        file_path: row.get(0)?,
        content_hash: row.get(1)?,
        date_added: row.get(2)?,
        date_updated: row.get(3)?,
    })
}
