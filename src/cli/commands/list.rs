//! List command implementation.

use super::Catalog;
use crate::cli::ListArgs;
use crate::error::Result;
use crate::storage::ItemFilter;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ListItem {
    id: String,
    file_path: String,
    slug: String,
    frontmatter: serde_json::Value,
    date_added: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_updated: Option<i64>,
}

/// List indexed items of one kind.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or a row cannot be read.
pub fn execute(
    args: &ListArgs,
    db_path: Option<&PathBuf>,
    root: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::open(db_path, root)?;
    let piece = catalog.piece(&args.kind)?;
    let filter = ItemFilter {
        file_paths: None,
        search: args.search.clone(),
        limit: args.limit,
    };
    let rows = piece.list(catalog.conn(), &filter)?;

    if json {
        let items = rows
            .iter()
            .map(|row| {
                let md = piece.to_markdown(row)?;
                Ok(ListItem {
                    id: row.id.clone(),
                    file_path: row.file_path.clone(),
                    slug: row.slug.clone(),
                    frontmatter: serde_json::Value::Object(md.frontmatter),
                    date_added: row.date_added,
                    date_updated: row.date_updated,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return super::print_json(&serde_json::json!({
            "kind": piece.name(),
            "count": items.len(),
            "items": items,
        }));
    }

    if rows.is_empty() {
        println!("No {} items indexed.", piece.name());
        return Ok(());
    }

    let width = rows.iter().map(|r| r.slug.len()).max().unwrap_or(0);
    for row in &rows {
        let md = piece.to_markdown(row)?;
        let title = md.title().unwrap_or_default();
        let added = chrono::DateTime::from_timestamp_millis(row.date_added)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{:<width$}  {}  {}", row.slug.bold(), title, added.dimmed());
    }
    println!();
    println!("{} {}", rows.len(), piece.name());
    Ok(())
}
