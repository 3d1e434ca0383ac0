//! Set and unset command implementations.
//!
//! Both read the item's file, apply the mutation, validate, write the file
//! back atomically and re-index it.

use super::{Catalog, sync_file};
use crate::error::Result;
use crate::frontmatter::FieldInput;
use crate::model::PieceMarkdown;
use crate::piece::Piece;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

/// Set a field. Several values are passed as a list.
///
/// # Errors
///
/// Returns an error for unknown fields, values that do not fit, attachment
/// failures or a document that no longer validates. The file is untouched
/// on error.
#[allow(clippy::too_many_arguments)]
pub fn execute(
    kind: &str,
    slug: &str,
    field: &str,
    values: &[String],
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let piece = catalog.piece(kind)?;
    let md = piece.get_by_slug(slug)?;

    let input = match values {
        [single] => FieldInput::from(single.as_str()),
        many => FieldInput::from(Value::Array(
            many.iter().cloned().map(Value::String).collect(),
        )),
    };
    let updated = piece.set_field(&md, field, input)?;

    save(&catalog, &piece, &updated, dry_run)?;
    report(&updated, field, "Set", dry_run, json)
}

/// Remove a field, or one value of a list field.
///
/// # Errors
///
/// Returns an error for unknown or required fields.
#[allow(clippy::too_many_arguments)]
pub fn execute_unset(
    kind: &str,
    slug: &str,
    field: &str,
    value: Option<&str>,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let piece = catalog.piece(kind)?;
    let md = piece.get_by_slug(slug)?;

    let expected = value.map(|v| Value::String(v.to_string()));
    let updated = piece.remove_field(&md, field, expected)?;

    if updated == md {
        if json {
            return super::print_json(&serde_json::json!({
                "changed": false,
                "item": md,
            }));
        }
        println!("{}: '{field}' unchanged", md.file_path);
        return Ok(());
    }

    save(&catalog, &piece, &updated, dry_run)?;
    report(&updated, field, "Unset", dry_run, json)
}

fn save(catalog: &Catalog, piece: &Piece, md: &PieceMarkdown, dry_run: bool) -> Result<()> {
    if dry_run {
        return piece.validate(md)?.into_result(&md.file_path);
    }
    piece.write(md)?;
    sync_file(piece, catalog.conn(), &md.file_path)?;
    Ok(())
}

fn report(md: &PieceMarkdown, field: &str, verb: &str, dry_run: bool, json: bool) -> Result<()> {
    if json {
        return super::print_json(&serde_json::json!({
            "changed": true,
            "dry_run": dry_run,
            "item": md,
        }));
    }

    let value = md
        .get(field)
        .map_or_else(|| "(removed)".to_string(), ToString::to_string);
    let prefix = if dry_run { "Would update" } else { verb };
    println!("{} {} {field} = {}", prefix.green(), md.file_path, value.dimmed());
    Ok(())
}
