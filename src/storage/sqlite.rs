//! SQLite connection handling.
//!
//! The catalog index is one SQLite file shared by every content type. A
//! single connection is opened per process and shared read/write by sync,
//! prune and the interactive commands.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::trace;

use crate::error::Result;
use crate::storage::schema::apply_schema;

/// SQLite-backed catalog index.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies the base schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        conn.pragma_update(None, "journal_mode", "WAL")?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Run `f` inside a transaction on a shared connection.
///
/// Commits when `f` succeeds and rolls back (on drop) when it fails. Used
/// by sync so a row write and its cache write land together.
///
/// # Errors
///
/// Returns the closure's error, or a database error from begin/commit.
pub fn with_transaction<F, R>(conn: &Connection, op: &str, f: F) -> Result<R>
where
    F: FnOnce(&Transaction) -> Result<R>,
{
    let tx = conn.unchecked_transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    trace!(op, "Transaction committed");
    Ok(result)
}
