//! The content-type contract.
//!
//! A content type supplies its name, its frontmatter schema and any derived
//! columns. Everything else (row building, diffing, file handling) is shared
//! and lives in provided methods or in [`Piece`](super::Piece).

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::error::Result;
use crate::frontmatter::frontmatter_value_to_database_value;
use crate::markdown::Frontmatter;
use crate::model::PieceMarkdown;
use crate::schema::FieldDef;
use crate::storage::{ItemRow, ItemValues};

/// A database column computed from frontmatter rather than stored in it.
#[derive(Debug, Clone, Copy)]
pub struct DerivedField {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Frontmatter fields the value is computed from.
    pub depends_on: &'static [&'static str],
    pub compute: fn(&Frontmatter) -> SqlValue,
}

/// One kind of catalog item (book, game, ...).
pub trait ContentType: Send + Sync {
    /// Directory and table name.
    fn name(&self) -> &'static str;

    /// JSON-Type-Definition document for the frontmatter.
    fn schema(&self) -> Value;

    fn derived_fields(&self) -> Vec<DerivedField> {
        Vec::new()
    }

    /// Full column set for inserting a document.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit its column.
    fn to_create_input(&self, fields: &[FieldDef], md: &PieceMarkdown) -> Result<ItemValues> {
        let mut values = ItemValues::new();
        values.set("file_path", SqlValue::Text(md.file_path.clone()));
        values.set("slug", SqlValue::Text(md.slug.clone()));
        values.set(
            "frontmatter_json",
            SqlValue::Text(serde_json::to_string(&md.frontmatter)?),
        );
        values.set("note", SqlValue::Text(md.note.clone()));

        for field in fields {
            let value = md.frontmatter.get(&field.name).unwrap_or(&Value::Null);
            values.set(
                field.name.clone(),
                frontmatter_value_to_database_value(field, value)?,
            );
        }

        for derived in self.derived_fields() {
            values.set(derived.name, (derived.compute)(&md.frontmatter));
        }

        Ok(values)
    }

    /// Columns to write when a document's row already exists.
    ///
    /// Without `force`, only columns that differ from `row` are returned, and
    /// a derived column is recomputed whenever one of its dependencies is in
    /// that set.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit its column.
    fn to_update_input(
        &self,
        fields: &[FieldDef],
        md: &PieceMarkdown,
        row: &ItemRow,
        force: bool,
    ) -> Result<ItemValues> {
        let all = self.to_create_input(fields, md)?;
        if force {
            return Ok(all);
        }

        let mut diff = all.clone().diff_against(row);
        for derived in self.derived_fields() {
            if derived.depends_on.iter().any(|dep| diff.contains(dep)) {
                if let Some(value) = all.get(derived.name) {
                    diff.set(derived.name, value.clone());
                }
            }
        }
        Ok(diff)
    }
}
