//! Validate command implementation.

use super::{Catalog, require_kind_for_slugs, target_files};
use crate::error::{Error, Result};
use crate::schema::FieldError;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<FieldError>,
}

/// Check markdown files against their schema without touching the index.
///
/// # Errors
///
/// Returns `Error::Validation` listing every problem in every invalid file.
pub fn execute(
    kind: Option<&str>,
    slugs: &[String],
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    require_kind_for_slugs(kind, slugs)?;
    let catalog = Catalog::open(db_path, root)?;

    let mut reports = Vec::new();
    for piece in catalog.pieces(kind)? {
        for file in target_files(&piece, slugs)? {
            let errors = match piece.get(&file) {
                Ok(md) => piece.validate(&md)?.errors,
                Err(e @ (Error::Parse { .. } | Error::NotFound { .. })) => {
                    vec![FieldError::new("", e.to_string())]
                }
                Err(e) => return Err(e),
            };
            reports.push(FileReport {
                valid: errors.is_empty(),
                file,
                errors,
            });
        }
    }

    let invalid: Vec<&FileReport> = reports.iter().filter(|r| !r.valid).collect();

    if json {
        super::print_json(&serde_json::json!({
            "checked": reports.len(),
            "invalid": invalid.len(),
            "files": reports,
        }))?;
    } else {
        for report in &invalid {
            println!("{} {}", "✗".red(), report.file.bold());
            for error in &report.errors {
                println!("    {error}");
            }
        }
        println!(
            "Checked {} file(s), {} invalid",
            reports.len(),
            invalid.len()
        );
    }

    if invalid.is_empty() {
        return Ok(());
    }
    Err(Error::Validation {
        path: format!("{} file(s)", invalid.len()),
        errors: invalid
            .iter()
            .flat_map(|r| {
                r.errors
                    .iter()
                    .map(|e| FieldError::new(format!("{}{}", r.file, e.path), e.message.clone()))
            })
            .collect(),
    })
}
