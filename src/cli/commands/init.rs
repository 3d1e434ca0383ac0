//! Initialize a Shelf catalog.
//!
//! Creates the SQLite index (by default `~/.shelf/data/shelf.db`) with an
//! item table per content type, and a directory per content type under the
//! catalog root. Running it again is harmless: tables are only extended.

use crate::config::{resolve_db_path, resolve_root};
use crate::error::{Error, Result};
use crate::piece::{Piece, kinds};
use crate::storage::{LocalStorage, SqliteStorage};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    root: PathBuf,
    kinds: Vec<&'static str>,
    created_database: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the database or directories cannot be created.
pub fn execute(
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("Could not determine the database location; pass --db".to_string())
    })?;
    let root = resolve_root(root.map(PathBuf::as_path))?;
    let created_database = !db_path.exists();

    if !dry_run {
        let storage = SqliteStorage::open(&db_path)?;
        for content_type in kinds::all() {
            let name = content_type.name();
            let piece = Piece::with_storage(content_type, Arc::new(LocalStorage::new(&root)));
            piece.ensure_table(storage.conn())?;
            fs::create_dir_all(root.join(name))?;
        }
    }

    let output = InitOutput {
        database: db_path,
        root,
        kinds: kinds::names(),
        created_database,
    };

    if json {
        return super::print_json(&output);
    }

    let verb = if dry_run { "Would initialize" } else { "Initialized" };
    println!("{} shelf catalog", verb.green());
    println!("  Database: {}", output.database.display());
    println!("  Root:     {}", output.root.display());
    println!("  Kinds:    {}", output.kinds.join(", "));
    println!();
    println!("Next: add markdown files under <root>/<kind>/ and run 'shelf sync'.");
    Ok(())
}
