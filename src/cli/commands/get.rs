//! Get command implementation.

use super::Catalog;
use crate::error::Result;
use std::path::PathBuf;

/// Print one item's markdown, read from its file.
///
/// # Errors
///
/// Returns `Error::NotFound` if the file does not exist.
pub fn execute(
    kind: &str,
    slug: &str,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let piece = catalog.piece(kind)?;
    let md = piece.get_by_slug(slug)?;

    if json {
        let outdated = piece.is_outdated(catalog.conn(), &md.file_path)?;
        return super::print_json(&serde_json::json!({
            "item": md,
            "outdated": outdated,
        }));
    }

    print!("{}", md.to_raw()?);
    Ok(())
}
