//! Markdown → SQLite synchronization.
//!
//! Markdown files are the source of truth; the database is an index over
//! them. Sync brings the index up to date for a list of files:
//!
//! - **Change detection**: SHA256 of the file bytes, compared with the
//!   content cache (see [`hash`])
//! - **Decision**: add (no row), update (forced, uncached or changed), or skip
//! - **Pruning**: rows whose files are gone are removed by [`prune`]
//!
//! # Streaming
//!
//! [`sync`] returns a [`SyncStream`], a lazy iterator of per-file outcomes.
//! Nothing happens until it is polled; dropping it early is always safe and
//! leaves every already-yielded file fully synced. A failure for one file is
//! yielded as that file's outcome and iteration continues.
//!
//! Reading, hashing and parsing are prefetched in windows of
//! `concurrency` files on scoped threads. Database work runs on the calling
//! thread, one file at a time, and outcomes come out in input order.
//!
//! # Example
//!
//! ```ignore
//! use shelf::sync::{SyncOptions, SyncSummary};
//!
//! let files = books.list_file_paths()?;
//! let summary: SyncSummary = books.sync(conn, files, SyncOptions::default()).collect();
//! println!("{} added, {} updated", summary.added, summary.updated);
//! ```

mod hash;
pub mod prune;
mod types;

pub use hash::{content_hash, has_changed, reader_hash};
pub use types::{FailedFile, SyncAction, SyncOutcome, SyncSummary};

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::PieceMarkdown;
use crate::piece::Piece;
use crate::storage::{cache, items, with_transaction};

/// Options for [`sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report what would happen without writing anything.
    pub dry_run: bool,
    /// Rewrite every column of existing rows, even when unchanged.
    pub force: bool,
    /// Files read and parsed ahead in parallel.
    pub concurrency: NonZeroUsize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            concurrency: default_concurrency(),
        }
    }
}

/// Logical CPU count, falling back to 1.
#[must_use]
pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// A file read, hashed, parsed and validated, ready for the database step.
struct Prepared {
    md: PieceMarkdown,
    hash: String,
}

/// Lazy stream of sync outcomes. See the [module docs](self).
pub struct SyncStream<'a> {
    piece: &'a Piece,
    conn: &'a Connection,
    options: SyncOptions,
    pending: VecDeque<String>,
    ready: VecDeque<(String, Result<Prepared>)>,
}

impl std::fmt::Debug for SyncStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStream")
            .field("piece", &self.piece.name())
            .field("options", &self.options)
            .field("pending", &self.pending.len())
            .field("ready", &self.ready.len())
            .finish()
    }
}

/// Start syncing `file_paths` (root-relative, e.g. `book/dune.md`).
///
/// The item table must exist (see [`Piece::ensure_table`]).
pub fn sync<'a>(
    piece: &'a Piece,
    conn: &'a Connection,
    file_paths: Vec<String>,
    options: SyncOptions,
) -> SyncStream<'a> {
    SyncStream {
        piece,
        conn,
        options,
        pending: file_paths.into(),
        ready: VecDeque::new(),
    }
}

impl SyncStream<'_> {
    /// Read, hash and parse the next window of files.
    fn prefetch(&mut self) {
        let take = self.options.concurrency.get().min(self.pending.len());
        let window: Vec<String> = self.pending.drain(..take).collect();
        if window.is_empty() {
            return;
        }

        // Compile once up front so worker threads only read the cached schema.
        if let Err(e) = self.piece.schema() {
            let message = e.to_string();
            self.ready.extend(
                window
                    .into_iter()
                    .map(|file| (file, Err(Error::Config(message.clone())))),
            );
            return;
        }

        let piece = self.piece;
        if window.len() == 1 {
            self.ready
                .extend(window.into_iter().map(|file| {
                    let prepared = prepare(piece, &file);
                    (file, prepared)
                }));
            return;
        }

        let results: Vec<Result<Prepared>> = std::thread::scope(|scope| {
            let handles: Vec<_> = window
                .iter()
                .map(|file| scope.spawn(move || prepare(piece, file)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::Other("file reader panicked".to_string())))
                })
                .collect()
        });

        self.ready.extend(window.into_iter().zip(results));
    }

    /// Apply the decision table to one prepared file.
    fn apply(&self, file: &str, prepared: Prepared) -> Result<SyncAction> {
        let Prepared { md, hash } = prepared;
        let table = self.piece.table();
        let content_type = self.piece.content_type();
        let fields = self.piece.fields()?;

        let cached = cache::get(self.conn, file)?;
        let row = items::select_item(self.conn, table, file)?;

        let Some(row) = row else {
            if !self.options.dry_run {
                let values = content_type.to_create_input(fields, &md)?;
                with_transaction(self.conn, "sync_add", |tx| {
                    items::insert_item(tx, table, &values)?;
                    cache::add(tx, file, &hash)
                })?;
            }
            return Ok(SyncAction::Added);
        };

        let stored_hash = cached.as_ref().map(|c| c.content_hash.as_str());
        if !self.options.force && !has_changed(&hash, stored_hash) {
            return Ok(SyncAction::Skipped);
        }

        if !self.options.dry_run {
            let values = content_type.to_update_input(fields, &md, &row, self.options.force)?;
            with_transaction(self.conn, "sync_update", |tx| {
                if !values.is_empty() {
                    items::update_item(tx, table, &row.id, &values)?;
                }
                cache::update(tx, file, &hash)
            })?;
        }
        Ok(SyncAction::Updated)
    }
}

impl Iterator for SyncStream<'_> {
    type Item = SyncOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ready.is_empty() {
            self.prefetch();
        }
        let (file, prepared) = self.ready.pop_front()?;

        let result = prepared.and_then(|prepared| self.apply(&file, prepared));
        match &result {
            Ok(action) => debug!(file = %file, ?action, dry_run = self.options.dry_run, "Synced"),
            Err(e) => warn!(file = %file, error = %e, "Sync failed"),
        }

        Some(SyncOutcome { file, result })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pending.len() + self.ready.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SyncStream<'_> {}

/// Read, hash, parse and validate one file.
fn prepare(piece: &Piece, file: &str) -> Result<Prepared> {
    let prefix = format!("{}/", piece.name());
    if !file.starts_with(&prefix) {
        return Err(Error::InvalidArgument(format!(
            "{file} is not in the {} directory",
            piece.name()
        )));
    }

    let bytes = piece.storage().read(file)?;
    let hash = content_hash(&bytes);
    let raw = String::from_utf8(bytes).map_err(|e| Error::Parse {
        path: file.to_string(),
        message: e.to_string(),
    })?;

    let md = PieceMarkdown::from_raw(piece.name(), file, &raw)?;
    piece.validate(&md)?.into_result(file)?;
    Ok(Prepared { md, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::kinds::Book;
    use crate::storage::{ItemFilter, SqliteStorage};
    use rusqlite::types::Value as SqlValue;
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        storage: SqliteStorage,
        piece: Piece,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let storage = SqliteStorage::open_memory().unwrap();
            let piece = Piece::new(Book, temp_dir.path());
            piece.ensure_table(storage.conn()).unwrap();
            Self {
                temp_dir,
                storage,
                piece,
            }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.temp_dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn sync_with(&self, options: SyncOptions) -> Vec<SyncOutcome> {
            let files = self.piece.list_file_paths().unwrap();
            self.piece.sync(self.storage.conn(), files, options).collect()
        }

        fn sync(&self) -> Vec<SyncOutcome> {
            self.sync_with(SyncOptions::default())
        }

        fn actions(outcomes: &[SyncOutcome]) -> Vec<SyncAction> {
            outcomes
                .iter()
                .map(|o| *o.result.as_ref().unwrap())
                .collect()
        }

        fn row_count(&self) -> usize {
            self.piece
                .list(self.storage.conn(), &ItemFilter::default())
                .unwrap()
                .len()
        }
    }

    #[test]
    fn test_add_then_skip() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\n---\n");
        fx.write("book/emma.md", "---\ntitle: Emma\n---\n");

        let first = fx.sync();
        assert_eq!(Fixture::actions(&first), vec![SyncAction::Added, SyncAction::Added]);
        assert_eq!(first[0].file, "book/dune.md");

        let second = fx.sync();
        assert_eq!(Fixture::actions(&second), vec![SyncAction::Skipped, SyncAction::Skipped]);
        assert_eq!(fx.row_count(), 2);
    }

    #[test]
    fn test_changed_file_is_updated_and_row_id_stable() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\n---\n");
        fx.sync();
        let before = items::select_item(fx.storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();

        fx.write("book/dune.md", "---\ntitle: Dune\nyear: 1965\n---\nSpice.\n");
        assert_eq!(Fixture::actions(&fx.sync()), vec![SyncAction::Updated]);

        let after = items::select_item(fx.storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.column("year"), &SqlValue::Integer(1965));
        assert_eq!(after.note, "Spice.\n");

        let entry = cache::get(fx.storage.conn(), "book/dune.md").unwrap().unwrap();
        assert_eq!(entry.content_hash, content_hash(b"---\ntitle: Dune\nyear: 1965\n---\nSpice.\n"));
    }

    #[test]
    fn test_force_updates_unchanged_files() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\n---\n");
        fx.sync();

        let forced = fx.sync_with(SyncOptions {
            force: true,
            ..SyncOptions::default()
        });
        assert_eq!(Fixture::actions(&forced), vec![SyncAction::Updated]);
    }

    #[test]
    fn test_force_rewrites_every_column() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\nyear_read: 2021\n---\n");
        fx.sync();

        let conn = fx.storage.conn();
        conn.execute("UPDATE book SET title = 'X', read_order = NULL", [])
            .unwrap();
        let title = |conn: &Connection| {
            items::select_item(conn, "book", "book/dune.md")
                .unwrap()
                .unwrap()
                .column("title")
                .clone()
        };

        assert_eq!(Fixture::actions(&fx.sync()), vec![SyncAction::Skipped]);
        assert_eq!(title(conn), SqlValue::Text("X".into()));

        let forced = fx.sync_with(SyncOptions {
            force: true,
            ..SyncOptions::default()
        });
        assert_eq!(Fixture::actions(&forced), vec![SyncAction::Updated]);
        assert_eq!(title(conn), SqlValue::Text("Dune".into()));
        let row = items::select_item(conn, "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(row.column("read_order"), &SqlValue::Integer(202_100));
    }

    #[test]
    fn test_out_of_range_integer_fails_only_its_file() {
        let fx = Fixture::new();
        fx.write("book/a.md", "---\ntitle: A\nyear_read: 100000000000000000\n---\n");
        fx.write("book/b.md", "---\ntitle: B\nyear_read: 2020\n---\n");

        let outcomes = fx.sync();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0].result {
            Err(Error::Validation { errors, .. }) => assert_eq!(errors[0].path, "/year_read"),
            other => panic!("expected a validation error, got {other:?}"),
        }
        assert!(matches!(outcomes[1].result, Ok(SyncAction::Added)));
        assert_eq!(fx.row_count(), 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\n---\n");

        let dry = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        assert_eq!(Fixture::actions(&fx.sync_with(dry)), vec![SyncAction::Added]);
        assert_eq!(fx.row_count(), 0);
        assert!(cache::get(fx.storage.conn(), "book/dune.md").unwrap().is_none());

        fx.sync();
        fx.write("book/dune.md", "---\ntitle: Dune Messiah\n---\n");
        assert_eq!(Fixture::actions(&fx.sync_with(dry)), vec![SyncAction::Updated]);
        let row = items::select_item(fx.storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(row.column("title"), &SqlValue::Text("Dune".into()));
    }

    #[test]
    fn test_cache_dropped_heals() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\n---\n");
        fx.sync();

        fx.storage.conn().execute("DELETE FROM cache", []).unwrap();
        assert_eq!(Fixture::actions(&fx.sync()), vec![SyncAction::Updated]);
        assert_eq!(Fixture::actions(&fx.sync()), vec![SyncAction::Skipped]);
        assert_eq!(fx.row_count(), 1);
    }

    #[test]
    fn test_per_file_errors_do_not_stop_the_stream() {
        let fx = Fixture::new();
        fx.write("book/a.md", "---\ntitle: A\n---\n");
        fx.write("book/b.md", "---\ntitle: [unclosed\n---\n");
        fx.write("book/c.md", "---\ntitle: C\ncolour: red\n---\n");
        fx.write("book/d.md", "---\ntitle: D\n---\n");

        let outcomes = fx.sync_with(SyncOptions {
            concurrency: NonZeroUsize::new(2).unwrap(),
            ..SyncOptions::default()
        });
        let files: Vec<_> = outcomes.iter().map(|o| o.file.as_str()).collect();
        assert_eq!(files, vec!["book/a.md", "book/b.md", "book/c.md", "book/d.md"]);

        assert!(matches!(outcomes[0].result, Ok(SyncAction::Added)));
        assert!(matches!(outcomes[1].result, Err(Error::Parse { .. })));
        assert!(matches!(outcomes[2].result, Err(Error::Validation { .. })));
        assert!(matches!(outcomes[3].result, Ok(SyncAction::Added)));
        assert_eq!(fx.row_count(), 2);
    }

    #[test]
    fn test_missing_file_is_an_outcome() {
        let fx = Fixture::new();
        let outcomes: Vec<_> = fx
            .piece
            .sync(
                fx.storage.conn(),
                vec!["book/ghost.md".into(), "game/zelda.md".into()],
                SyncOptions::default(),
            )
            .collect();
        assert!(matches!(outcomes[0].result, Err(Error::NotFound { .. })));
        assert!(matches!(outcomes[1].result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_stream_is_lazy() {
        let fx = Fixture::new();
        fx.write("book/a.md", "---\ntitle: A\n---\n");
        fx.write("book/b.md", "---\ntitle: B\n---\n");

        let files = fx.piece.list_file_paths().unwrap();
        let mut stream = fx.piece.sync(
            fx.storage.conn(),
            files,
            SyncOptions {
                concurrency: NonZeroUsize::MIN,
                ..SyncOptions::default()
            },
        );
        assert_eq!(stream.len(), 2);
        assert_eq!(fx.row_count(), 0);

        stream.next().unwrap().result.unwrap();
        drop(stream);
        assert_eq!(fx.row_count(), 1);
    }

    #[test]
    fn test_derived_column_recomputed() {
        let fx = Fixture::new();
        fx.write("book/dune.md", "---\ntitle: Dune\nyear_read: 2021\n---\n");
        fx.sync();
        let row = items::select_item(fx.storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(row.column("read_order"), &SqlValue::Integer(202_100));

        fx.write("book/dune.md", "---\ntitle: Dune\nyear_read: 2021\nmonth_read: 3\n---\n");
        fx.sync();
        let row = items::select_item(fx.storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(row.column("read_order"), &SqlValue::Integer(202_103));
    }

    #[test]
    fn test_summary_from_outcomes() {
        let fx = Fixture::new();
        fx.write("book/a.md", "---\ntitle: A\n---\n");
        fx.write("book/b.md", "not: [frontmatter\n");
        fx.write("book/c.md", "---\n: bad\n");

        let summary: SyncSummary = fx.sync().into_iter().collect();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.failed.len(), 2);
        assert!(!summary.is_success());
    }
}
