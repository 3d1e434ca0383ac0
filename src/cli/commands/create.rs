//! Create command implementation.

use super::{Catalog, sync_file};
use crate::cli::CreateArgs;
use crate::error::{Error, Result};
use crate::frontmatter::FieldInput;
use crate::markdown::Frontmatter;
use crate::model::PieceMarkdown;
use colored::Colorize;
use std::path::PathBuf;

/// Create a new item file and index it.
///
/// With `--dry-run`, the document is built and validated but neither the
/// file nor the index is written.
///
/// # Errors
///
/// Returns `Error::AlreadyExists` if the file exists, or a field error.
pub fn execute(
    args: &CreateArgs,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let piece = catalog.piece(&args.kind)?;
    let initial: Vec<(String, FieldInput)> = args
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), FieldInput::from(value.as_str())))
        .collect();

    let md = if dry_run {
        let blank = PieceMarkdown::new(piece.name(), &args.slug, Frontmatter::new(), String::new())?;
        if piece.storage().exists(&blank.file_path) {
            return Err(Error::AlreadyExists {
                path: piece.storage().resolve(&blank.file_path),
            });
        }
        let mut values = vec![("title".to_string(), FieldInput::from(args.title.as_str()))];
        values.extend(initial);
        let md = piece.set_fields(&blank, values)?;
        piece.validate(&md)?.into_result(&md.file_path)?;
        md
    } else {
        let md = piece.create(&args.slug, &args.title, initial)?;
        sync_file(&piece, catalog.conn(), &md.file_path)?;
        md
    };

    if json {
        return super::print_json(&serde_json::json!({
            "created": !dry_run,
            "item": md,
        }));
    }

    if dry_run {
        println!("Would create {}:", md.file_path);
        print!("{}", md.to_raw()?);
    } else {
        println!("{} {}", "Created".green(), md.file_path);
    }
    Ok(())
}
