//! Status command implementation.

use super::Catalog;
use crate::error::Result;
use crate::storage::{ItemFilter, cache};
use crate::sync::prune::PruneOptions;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for status command.
#[derive(Serialize)]
struct KindStatus {
    kind: &'static str,
    files: usize,
    indexed: usize,
    /// Files modified since their last sync, or never synced.
    outdated: Vec<String>,
    /// Indexed items whose files are gone.
    missing: Vec<String>,
}

/// Show what `sync` and `prune` would change, per kind.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or read.
pub fn execute(
    kind: Option<&str>,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let conn = catalog.conn();

    let mut statuses = Vec::new();
    for piece in catalog.pieces(kind)? {
        let files = piece.list_file_paths()?;
        let mut outdated = Vec::new();
        for file in &files {
            if piece.is_outdated(conn, file)? {
                outdated.push(file.clone());
            }
        }
        let missing = piece
            .prune(conn, &files, PruneOptions { dry_run: true })?
            .map(|outcome| outcome.file)
            .collect();

        statuses.push(KindStatus {
            kind: piece.name(),
            files: files.len(),
            indexed: piece.list(conn, &ItemFilter::default())?.len(),
            outdated,
            missing,
        });
    }
    let cached = cache::list(conn, None)?.len();

    if json {
        return super::print_json(&serde_json::json!({
            "root": catalog.root(),
            "cached_files": cached,
            "kinds": statuses,
        }));
    }

    println!("Catalog: {}", catalog.root().display());
    for status in &statuses {
        let clean = status.outdated.is_empty() && status.missing.is_empty();
        let marker = if clean { "✓".green() } else { "•".yellow() };
        println!(
            "{marker} {:<6} {} files, {} indexed",
            status.kind.bold(),
            status.files,
            status.indexed
        );
        for file in &status.outdated {
            println!("    {} {file}", "changed".yellow());
        }
        for file in &status.missing {
            println!("    {} {file}", "missing".red());
        }
    }

    let pending: usize = statuses.iter().map(|s| s.outdated.len()).sum();
    let stale: usize = statuses.iter().map(|s| s.missing.len()).sum();
    if pending > 0 || stale > 0 {
        println!();
        println!("Run 'shelf sync' to index {pending} changed file(s) and 'shelf prune' to drop {stale} missing.");
    }
    Ok(())
}
