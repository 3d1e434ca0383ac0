//! Prune command implementation.

use super::Catalog;
use crate::error::{Error, Result};
use crate::sync::SyncSummary;
use crate::sync::prune::PruneOptions;
use colored::Colorize;
use std::path::PathBuf;

/// Remove indexed items whose markdown files no longer exist.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened, or if any row failed.
pub fn execute(
    kind: Option<&str>,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let options = PruneOptions { dry_run };

    let mut summary = SyncSummary::default();
    let mut pruned = Vec::new();
    for piece in catalog.pieces(kind)? {
        let known = piece.list_file_paths()?;
        for outcome in piece.prune(catalog.conn(), &known, options)? {
            match &outcome.result {
                Ok(()) => {
                    if !json {
                        println!("{} {}", "-".red(), outcome.file);
                    }
                    summary.record_pruned();
                    pruned.push(outcome.file);
                }
                Err(e) => {
                    if !json {
                        println!("{} {}: {e}", "!".red(), outcome.file);
                    }
                    summary.record_failure(&outcome.file, e);
                }
            }
        }
    }

    if json {
        super::print_json(&serde_json::json!({
            "dry_run": dry_run,
            "pruned": pruned,
            "failed": summary.failed,
        }))?;
    } else if pruned.is_empty() && summary.is_success() {
        println!("Nothing to prune.");
    } else {
        let verb = if dry_run { "Would prune" } else { "Pruned" };
        println!("{verb} {} item(s)", summary.pruned);
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(Error::Other(format!(
            "{} item(s) failed to prune",
            summary.failed.len()
        )))
    }
}
