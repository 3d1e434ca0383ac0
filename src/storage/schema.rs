//! Database schema definitions.
//!
//! The cache table is fixed. Item tables are bootstrapped per content type
//! from its compiled frontmatter schema: fixed bookkeeping columns plus one
//! column per field and per derived field. Columns added to a schema later
//! are appended with `ALTER TABLE`; columns are never dropped.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Base schema applied on every open. Timestamps are Unix milliseconds.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS cache (
    file_path TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL,
    date_added INTEGER NOT NULL,
    date_updated INTEGER
);
";

/// Bookkeeping columns every item table has. Schema fields may not reuse them.
pub const RESERVED_COLUMNS: [&str; 7] = [
    "id",
    "file_path",
    "slug",
    "frontmatter_json",
    "note",
    "date_added",
    "date_updated",
];

/// A content-type column (frontmatter field or derived field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: &'static str,
}

/// Apply the base schema.
///
/// # Errors
///
/// Returns an error if the DDL fails.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Quote an identifier for interpolation into SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create an item table if missing and append any missing columns.
///
/// # Errors
///
/// Returns an error if the DDL fails.
pub fn ensure_item_table(conn: &Connection, table: &str, columns: &[ColumnDef]) -> Result<()> {
    let table_q = quote_ident(table);

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {table_q} (
            id TEXT PRIMARY KEY,
            file_path TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL,
            frontmatter_json TEXT NOT NULL DEFAULT '{{}}',
            note TEXT NOT NULL DEFAULT '',
            date_added INTEGER NOT NULL,
            date_updated INTEGER"
    );
    for column in columns {
        ddl.push_str(&format!(",\n            {} {}", quote_ident(&column.name), column.sql_type));
    }
    ddl.push_str("\n        )");
    conn.execute(&ddl, [])?;

    let existing: HashSet<String> = conn
        .prepare(&format!("PRAGMA table_info({table_q})"))?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;

    for column in columns.iter().filter(|c| !existing.contains(&c.name)) {
        info!(table, column = %column.name, "Adding column");
        conn.execute(
            &format!(
                "ALTER TABLE {table_q} ADD COLUMN {} {}",
                quote_ident(&column.name),
                column.sql_type
            ),
            [],
        )?;
    }

    Ok(())
}
