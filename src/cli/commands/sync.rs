//! Sync command implementation.
//!
//! Streams one line per added, updated or failed file as the sync engine
//! yields it, then prints a summary. Failed files do not stop the run; they
//! make the command exit non-zero at the end.

use super::{Catalog, require_kind_for_slugs, target_files};
use crate::cli::SyncArgs;
use crate::config::resolve_concurrency;
use crate::error::{Error, Result};
use crate::sync::{SyncAction, SyncOptions, SyncSummary};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened, or if any file failed.
pub fn execute(
    args: &SyncArgs,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    require_kind_for_slugs(args.kind.as_deref(), &args.slugs)?;
    let catalog = Catalog::open(db_path, root)?;
    let options = SyncOptions {
        dry_run,
        force: args.force,
        concurrency: resolve_concurrency(args.concurrency)?,
    };

    let mut summary = SyncSummary::default();
    for piece in catalog.pieces(args.kind.as_deref())? {
        let files = target_files(&piece, &args.slugs)?;
        for outcome in piece.sync(catalog.conn(), files, options) {
            if !json {
                match &outcome.result {
                    Ok(SyncAction::Added) => println!("{} {}", "+".green(), outcome.file),
                    Ok(SyncAction::Updated) => println!("{} {}", "~".yellow(), outcome.file),
                    Ok(SyncAction::Skipped) => {}
                    Err(e) => println!("{} {}: {e}", "!".red(), outcome.file),
                }
            }
            summary.record(&outcome);
        }
    }

    if json {
        super::print_json(&serde_json::json!({
            "dry_run": dry_run,
            "force": args.force,
            "summary": summary,
        }))?;
    } else {
        let prefix = if dry_run { "Would sync" } else { "Synced" };
        println!(
            "{prefix} {} files: {} added, {} updated, {} unchanged, {} failed",
            summary.total() + summary.failed.len(),
            summary.added,
            summary.updated,
            summary.skipped,
            summary.failed.len()
        );
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(Error::Other(format!(
            "{} file(s) failed to sync",
            summary.failed.len()
        )))
    }
}
