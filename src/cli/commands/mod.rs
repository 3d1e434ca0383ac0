//! Command implementations.

pub mod completions;
pub mod create;
pub mod fields;
pub mod get;
pub mod init;
pub mod list;
pub mod prune;
pub mod set;
pub mod status;
pub mod sync;
pub mod validate;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;

use crate::config::{resolve_db_path, resolve_root};
use crate::error::{Error, Result};
use crate::piece::{Piece, kinds};
use crate::storage::{FileStorage, LocalStorage, SqliteStorage};
use crate::sync::{SyncAction, SyncOptions};

/// An opened catalog: the database plus the markdown root.
pub struct Catalog {
    storage: SqliteStorage,
    files: Arc<dyn FileStorage>,
    root: PathBuf,
}

impl Catalog {
    /// Open an initialized catalog and make sure every item table is current.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` if the database does not exist yet.
    pub fn open(db_path: Option<&PathBuf>, root: Option<&PathBuf>) -> Result<Self> {
        let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }
        let root = resolve_root(root.map(PathBuf::as_path))?;
        let storage = SqliteStorage::open(&db_path)?;

        let catalog = Self {
            storage,
            files: Arc::new(LocalStorage::new(&root)),
            root,
        };
        for piece in catalog.pieces(None)? {
            piece.ensure_table(catalog.conn())?;
        }
        Ok(catalog)
    }

    #[must_use]
    pub fn conn(&self) -> &Connection {
        self.storage.conn()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The piece for a content-type name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for unknown kinds.
    pub fn piece(&self, kind: &str) -> Result<Piece> {
        let content_type = kinds::by_name(kind).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown kind '{kind}' (expected one of: {})",
                kinds::names().join(", ")
            ))
        })?;
        Ok(Piece::with_storage(content_type, Arc::clone(&self.files)))
    }

    /// One piece, or every built-in piece when `kind` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for unknown kinds.
    pub fn pieces(&self, kind: Option<&str>) -> Result<Vec<Piece>> {
        match kind {
            Some(kind) => Ok(vec![self.piece(kind)?]),
            None => Ok(kinds::all()
                .into_iter()
                .map(|content_type| Piece::with_storage(content_type, Arc::clone(&self.files)))
                .collect()),
        }
    }
}

/// Files to act on: the given slugs, or every file of the piece.
pub(crate) fn target_files(piece: &Piece, slugs: &[String]) -> Result<Vec<String>> {
    if slugs.is_empty() {
        return piece.list_file_paths();
    }
    slugs
        .iter()
        .map(|slug| {
            crate::model::validate_slug(slug)?;
            Ok(crate::model::file_path_for(piece.name(), slug))
        })
        .collect()
}

/// Slugs only make sense for a single kind.
pub(crate) fn require_kind_for_slugs(kind: Option<&str>, slugs: &[String]) -> Result<()> {
    if kind.is_none() && !slugs.is_empty() {
        return Err(Error::InvalidArgument(
            "slugs require a kind, e.g. `book dune`".to_string(),
        ));
    }
    Ok(())
}

/// Index one file right after a command wrote it.
pub(crate) fn sync_file(piece: &Piece, conn: &Connection, file_path: &str) -> Result<SyncAction> {
    piece
        .sync(conn, vec![file_path.to_string()], SyncOptions::default())
        .next()
        .map_or_else(
            || Err(Error::Other(format!("sync produced no outcome for {file_path}"))),
            |outcome| outcome.result,
        )
}

/// Print a JSON payload on one line.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
