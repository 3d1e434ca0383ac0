//! Fields command implementation.

use crate::error::{Error, Result};
use crate::piece::{Piece, kinds};
use crate::schema::FieldDef;
use crate::storage::LocalStorage;
use colored::Colorize;
use std::sync::Arc;

/// Describe a content type's frontmatter fields and derived columns.
///
/// Works without a database: only the schema is consulted.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` for unknown kinds.
pub fn execute(kind: &str, json: bool) -> Result<()> {
    let content_type = kinds::by_name(kind).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "unknown kind '{kind}' (expected one of: {})",
            kinds::names().join(", ")
        ))
    })?;
    let derived: Vec<_> = content_type
        .derived_fields()
        .iter()
        .map(|d| (d.name, d.depends_on))
        .collect();
    // Only the schema is read; the storage root is never touched.
    let piece = Piece::with_storage(content_type, Arc::new(LocalStorage::new(".")));
    let fields = piece.fields()?;

    if json {
        return super::print_json(&serde_json::json!({
            "kind": piece.name(),
            "fields": fields,
            "derived": derived
                .iter()
                .map(|(name, deps)| serde_json::json!({ "name": name, "depends_on": deps }))
                .collect::<Vec<_>>(),
        }));
    }

    println!("{}", piece.name().cyan().bold());
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for field in fields {
        println!(
            "  {:<width$}  {}{}",
            field.name.bold(),
            type_label(field),
            flags(field).dimmed()
        );
        if let Some(description) = &field.description {
            println!("  {:<width$}  {}", "", description.dimmed());
        }
    }
    for (name, deps) in derived {
        println!(
            "  {:<width$}  {}",
            name.bold(),
            format!("derived from {}", deps.join(", ")).dimmed()
        );
    }
    Ok(())
}

fn type_label(field: &FieldDef) -> String {
    if field.is_array() {
        format!("list of {}", field.item_type.label())
    } else {
        field.item_type.label()
    }
}

fn flags(field: &FieldDef) -> String {
    let mut flags = Vec::new();
    if field.required {
        flags.push("required".to_string());
    }
    if field.nullable {
        flags.push("nullable".to_string());
    }
    if field.is_asset() {
        flags.push("asset".to_string());
    }
    if let Some(default) = &field.default {
        flags.push(format!("default {default}"));
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}
