//! Removal of rows whose markdown files no longer exist.
//!
//! The set of stale rows is snapshotted when [`prune`] is called; the
//! returned stream then deletes them one at a time, each row together with
//! its cache entry.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;
use crate::piece::Piece;
use crate::storage::{ItemFilter, ItemRow, cache, items, with_transaction};

/// Options for [`prune`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Report stale rows without deleting them.
    pub dry_run: bool,
}

/// Result of pruning one row.
#[derive(Debug)]
pub struct PruneOutcome {
    pub file: String,
    pub result: Result<()>,
}

/// Lazy stream of prune outcomes.
pub struct PruneStream<'a> {
    piece: &'a Piece,
    conn: &'a Connection,
    options: PruneOptions,
    stale: std::vec::IntoIter<ItemRow>,
}

impl std::fmt::Debug for PruneStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PruneStream")
            .field("piece", &self.piece.name())
            .field("options", &self.options)
            .field("remaining", &self.stale.len())
            .finish()
    }
}

/// Find rows of `piece` whose file path is not in `known_file_paths`.
///
/// # Errors
///
/// Returns an error if the rows cannot be read.
pub fn prune<'a>(
    piece: &'a Piece,
    conn: &'a Connection,
    known_file_paths: &[String],
    options: PruneOptions,
) -> Result<PruneStream<'a>> {
    let known: HashSet<&str> = known_file_paths.iter().map(String::as_str).collect();
    let stale: Vec<ItemRow> = items::select_items(conn, piece.table(), &ItemFilter::default())?
        .into_iter()
        .filter(|row| !known.contains(row.file_path.as_str()))
        .collect();

    debug!(piece = piece.name(), stale = stale.len(), "Prune snapshot");
    Ok(PruneStream {
        piece,
        conn,
        options,
        stale: stale.into_iter(),
    })
}

impl Iterator for PruneStream<'_> {
    type Item = PruneOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.stale.next()?;
        let table = self.piece.table();

        let result = if self.options.dry_run {
            Ok(())
        } else {
            with_transaction(self.conn, "prune", |tx| {
                items::delete_items(tx, table, std::slice::from_ref(&row.id))?;
                cache::remove(tx, &row.file_path)
            })
        };

        match &result {
            Ok(()) => debug!(file = %row.file_path, dry_run = self.options.dry_run, "Pruned"),
            Err(e) => warn!(file = %row.file_path, error = %e, "Prune failed"),
        }

        Some(PruneOutcome {
            file: row.file_path,
            result,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stale.size_hint()
    }
}

impl ExactSizeIterator for PruneStream<'_> {}
