//! Content types and the operations shared by all of them.
//!
//! A [`Piece`] binds a [`ContentType`] to catalog file storage. It offers:
//! - reflection over the type's compiled schema ([`Piece::fields`], [`Piece::field`])
//! - a copy-on-write mutation API over [`PieceMarkdown`] values
//! - file operations (create, get, write, delete) that never persist an
//!   invalid document
//! - entry points into the sync and prune engines
//!
//! # Example
//!
//! ```ignore
//! use shelf::piece::{Piece, kinds::Book};
//! use shelf::sync::SyncOptions;
//!
//! let books = Piece::new(Book, "/home/me/catalog");
//! let dune = books.create("dune", "Dune", vec![("year".into(), "1965".into())])?;
//! let dune = books.set_field(&dune, "tags", vec!["sf", "classic"])?;
//! books.write(&dune)?;
//!
//! for outcome in books.sync(conn, books.list_file_paths()?, SyncOptions::default()) {
//!     println!("{}: {:?}", outcome.file, outcome.result);
//! }
//! ```

mod content_type;
pub mod kinds;

pub use content_type::{ContentType, DerivedField};

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::frontmatter::{
    AssetContext, FieldInput, coerce, database_value_to_frontmatter_value, make_piece_value, sql_type,
};
use crate::markdown::Frontmatter;
use crate::model::{PieceMarkdown, file_path_for};
use crate::schema::{CompiledSchema, FieldDef, ValidationReport};
use crate::storage::schema::RESERVED_COLUMNS;
use crate::storage::{
    ColumnDef, FileStorage, ItemFilter, ItemRow, LocalStorage, cache, ensure_item_table, items,
    with_transaction,
};
use crate::sync::prune::{PruneOptions, PruneStream};
use crate::sync::{SyncOptions, SyncStream};

/// A content type bound to a catalog.
pub struct Piece {
    content_type: Box<dyn ContentType>,
    storage: Arc<dyn FileStorage>,
    schema: OnceLock<CompiledSchema>,
}

impl std::fmt::Debug for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Piece")
            .field("name", &self.name())
            .field("schema", &self.schema.get())
            .finish_non_exhaustive()
    }
}

impl Piece {
    /// Bind a content type to a catalog directory on the local filesystem.
    pub fn new(content_type: impl ContentType + 'static, root: impl Into<PathBuf>) -> Self {
        Self::with_storage(Box::new(content_type), Arc::new(LocalStorage::new(root)))
    }

    /// Bind a content type to arbitrary catalog storage.
    #[must_use]
    pub fn with_storage(content_type: Box<dyn ContentType>, storage: Arc<dyn FileStorage>) -> Self {
        Self {
            content_type,
            storage,
            schema: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.content_type.name()
    }

    /// Item table name.
    #[must_use]
    pub fn table(&self) -> &'static str {
        self.content_type.name()
    }

    #[must_use]
    pub fn content_type(&self) -> &dyn ContentType {
        self.content_type.as_ref()
    }

    #[must_use]
    pub fn storage(&self) -> &dyn FileStorage {
        self.storage.as_ref()
    }

    /// The compiled schema, compiled on first use.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the content type's schema is invalid.
    pub fn schema(&self) -> Result<&CompiledSchema> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema);
        }
        let compiled = self.compile_schema()?;
        Ok(self.schema.get_or_init(|| compiled))
    }

    fn compile_schema(&self) -> Result<CompiledSchema> {
        let schema = CompiledSchema::compile(&self.content_type.schema())?;
        let derived = self.content_type.derived_fields();
        for field in schema.fields() {
            if RESERVED_COLUMNS.contains(&field.name.as_str())
                || derived.iter().any(|d| d.name == field.name)
            {
                return Err(Error::Config(format!(
                    "{}: field '{}' collides with a built-in column",
                    self.name(),
                    field.name
                )));
            }
        }
        Ok(schema)
    }

    /// Field definitions in schema order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the content type's schema is invalid.
    pub fn fields(&self) -> Result<&[FieldDef]> {
        Ok(self.schema()?.fields())
    }

    /// Look up one field.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownField` if the schema has no such field.
    pub fn field(&self, name: &str) -> Result<&FieldDef> {
        let schema = self.schema()?;
        schema.field(name).ok_or_else(|| Error::UnknownField {
            piece: self.name().to_string(),
            field: name.to_string(),
            known: schema.fields().iter().map(|f| f.name.clone()).collect(),
        })
    }

    fn asset_context(&self) -> AssetContext<'_> {
        AssetContext {
            storage: self.storage.as_ref(),
            piece: self.name(),
        }
    }

    // ── Mutation ─────────────────────────────────────────────

    /// Return a copy of `md` with the given fields set.
    ///
    /// A scalar given for an array field becomes a one-element array; an
    /// array replaces the whole value. Asset inputs are stored in the
    /// catalog and replaced by their stored path. Every name is checked
    /// before any value is resolved.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownField`, `Error::InvalidArgument` for values
    /// that cannot be coerced, or `Error::Attachment`. `md` is unchanged.
    pub fn set_fields(
        &self,
        md: &PieceMarkdown,
        values: Vec<(String, FieldInput)>,
    ) -> Result<PieceMarkdown> {
        for (name, _) in &values {
            self.field(name)?;
        }

        let ctx = self.asset_context();
        let mut frontmatter = md.frontmatter.clone();
        for (name, input) in values {
            let value = make_piece_value(self.field(&name)?, input, &ctx)?;
            frontmatter.insert(name, value);
        }
        Ok(md.with_frontmatter(frontmatter))
    }

    /// Single-field form of [`Piece::set_fields`].
    ///
    /// # Errors
    ///
    /// See [`Piece::set_fields`].
    pub fn set_field(
        &self,
        md: &PieceMarkdown,
        name: &str,
        input: impl Into<FieldInput>,
    ) -> Result<PieceMarkdown> {
        self.set_fields(md, vec![(name.to_string(), input.into())])
    }

    /// Return a copy of `md` with the given fields removed.
    ///
    /// With an expected value, an array field loses only the matching
    /// elements (and disappears once empty). A scalar field is removed only
    /// if its current value equals the expected one; otherwise it is left
    /// as is.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownField` or `Error::RequiredField`, checked for
    /// every name before anything is removed.
    pub fn remove_fields(
        &self,
        md: &PieceMarkdown,
        removals: Vec<(String, Option<Value>)>,
    ) -> Result<PieceMarkdown> {
        for (name, _) in &removals {
            let field = self.field(name)?;
            if field.required {
                return Err(Error::RequiredField {
                    field: field.name.clone(),
                });
            }
        }

        let mut frontmatter = md.frontmatter.clone();
        for (name, expected) in removals {
            let field = self.field(&name)?;
            match expected {
                None => {
                    frontmatter.shift_remove(&name);
                }
                Some(expected) if field.is_array() => {
                    let targets = match coerce(field, expected) {
                        Ok(Value::Array(items)) => items,
                        _ => continue,
                    };
                    let now_empty = match frontmatter.get_mut(&name) {
                        Some(Value::Array(items)) => {
                            items.retain(|item| !targets.iter().any(|t| values_equal(item, t)));
                            items.is_empty()
                        }
                        _ => false,
                    };
                    if now_empty {
                        frontmatter.shift_remove(&name);
                    }
                }
                Some(expected) => {
                    let matches = match (coerce(field, expected), frontmatter.get(&name)) {
                        (Ok(expected), Some(current)) => values_equal(current, &expected),
                        _ => false,
                    };
                    if matches {
                        frontmatter.shift_remove(&name);
                    }
                }
            }
        }
        Ok(md.with_frontmatter(frontmatter))
    }

    /// Single-field form of [`Piece::remove_fields`].
    ///
    /// # Errors
    ///
    /// See [`Piece::remove_fields`].
    pub fn remove_field(
        &self,
        md: &PieceMarkdown,
        name: &str,
        expected: Option<Value>,
    ) -> Result<PieceMarkdown> {
        self.remove_fields(md, vec![(name.to_string(), expected)])
    }

    // ── Files ────────────────────────────────────────────────

    /// Create and write a new document.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyExists` if the file exists, or any error from
    /// [`Piece::set_fields`] and [`Piece::write`]. Nothing is written on error.
    pub fn create(
        &self,
        slug: &str,
        title: &str,
        initial_fields: Vec<(String, FieldInput)>,
    ) -> Result<PieceMarkdown> {
        let blank = PieceMarkdown::new(self.name(), slug, Frontmatter::new(), String::new())?;
        if self.storage.exists(&blank.file_path) {
            return Err(Error::AlreadyExists {
                path: self.storage.resolve(&blank.file_path),
            });
        }

        let mut values = vec![("title".to_string(), FieldInput::from(title))];
        values.extend(initial_fields);
        let md = self.set_fields(&blank, values)?;
        self.write(&md)?;
        Ok(md)
    }

    /// Read and parse a document.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file is missing, `Error::Parse` if it
    /// is not valid UTF-8 or has malformed frontmatter.
    pub fn get(&self, file_path: &str) -> Result<PieceMarkdown> {
        let bytes = self.storage.read(file_path)?;
        let raw = String::from_utf8(bytes).map_err(|e| Error::Parse {
            path: file_path.to_string(),
            message: e.to_string(),
        })?;
        PieceMarkdown::from_raw(self.name(), file_path, &raw)
    }

    /// Read a document by slug.
    ///
    /// # Errors
    ///
    /// See [`Piece::get`].
    pub fn get_by_slug(&self, slug: &str) -> Result<PieceMarkdown> {
        self.get(&file_path_for(self.name(), slug))
    }

    /// Validate and atomically write a document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing every invalid field (the file is
    /// not touched), or an I/O error.
    pub fn write(&self, md: &PieceMarkdown) -> Result<()> {
        self.validate(md)?.into_result(&md.file_path)?;
        let raw = md.to_raw()?;
        self.storage.write(&md.file_path, raw.as_bytes())?;
        debug!(file = %md.file_path, bytes = raw.len(), "Wrote document");
        Ok(())
    }

    /// Check a document against the schema.
    ///
    /// # Errors
    ///
    /// Only fails if the schema itself cannot be compiled.
    pub fn validate(&self, md: &PieceMarkdown) -> Result<ValidationReport> {
        Ok(self.schema()?.validate(&md.frontmatter))
    }

    /// Whether the file was modified after it was last synced.
    ///
    /// Files never synced are outdated.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file is missing.
    pub fn is_outdated(&self, conn: &Connection, file_path: &str) -> Result<bool> {
        let modified = self.storage.modified(file_path)?;
        Ok(cache::get(conn, file_path)?.is_none_or(|entry| modified > entry.last_synced()))
    }

    /// Delete a document's file, row and cache entry.
    ///
    /// The file is removed first. If the index transaction then fails, the
    /// leftover row is dropped by the next prune.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if there is neither a file nor a row. A file
    /// that cannot be removed leaves the index untouched.
    pub fn delete(&self, conn: &Connection, file_path: &str) -> Result<()> {
        let file_exists = self.storage.exists(file_path);
        if file_exists {
            self.storage.remove(file_path)?;
        }

        let removed_row = with_transaction(conn, "delete", |tx| {
            let row = items::select_item(tx, self.table(), file_path)?;
            if let Some(row) = &row {
                items::delete_items(tx, self.table(), std::slice::from_ref(&row.id))?;
            }
            cache::remove(tx, file_path)?;
            Ok(row.is_some())
        })?;

        if !file_exists && !removed_row {
            return Err(Error::NotFound {
                path: file_path.to_string(),
            });
        }

        info!(file = file_path, "Deleted");
        Ok(())
    }

    /// Rebuild a document from its database row.
    ///
    /// Fields appear in the order of the stored frontmatter, then any
    /// remaining schema fields with a value.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored column does not fit its field.
    pub fn to_markdown(&self, row: &ItemRow) -> Result<PieceMarkdown> {
        let schema = self.schema()?;
        let stored: Frontmatter = serde_json::from_str(&row.frontmatter_json)?;

        let order = stored
            .keys()
            .map(String::as_str)
            .chain(schema.fields().iter().map(|f| f.name.as_str()));

        let mut frontmatter = Frontmatter::new();
        for name in order {
            if frontmatter.contains_key(name) {
                continue;
            }
            let Some(field) = schema.field(name) else {
                continue;
            };
            let value = database_value_to_frontmatter_value(field, row.column(name))?;
            if !value.is_null() || stored.get(name).is_some_and(Value::is_null) {
                frontmatter.insert(name.to_string(), value);
            }
        }

        Ok(PieceMarkdown {
            file_path: row.file_path.clone(),
            piece: self.name().to_string(),
            slug: row.slug.clone(),
            frontmatter,
            note: row.note.clone(),
        })
    }

    /// Markdown files present in this type's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_file_paths(&self) -> Result<Vec<String>> {
        self.storage.list_markdown(self.name())
    }

    // ── Database ─────────────────────────────────────────────

    /// Columns of this type's item table beyond the bookkeeping ones.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the schema is invalid.
    pub fn columns(&self) -> Result<Vec<ColumnDef>> {
        let mut columns: Vec<ColumnDef> = self
            .fields()?
            .iter()
            .map(|field| ColumnDef {
                name: field.name.clone(),
                sql_type: sql_type(field),
            })
            .collect();
        columns.extend(self.content_type.derived_fields().iter().map(|d| ColumnDef {
            name: d.name.to_string(),
            sql_type: d.sql_type,
        }));
        Ok(columns)
    }

    /// Create or extend this type's item table.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema is invalid or the DDL fails.
    pub fn ensure_table(&self, conn: &Connection) -> Result<()> {
        ensure_item_table(conn, self.table(), &self.columns()?)
    }

    /// Rows matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list(&self, conn: &Connection, filter: &ItemFilter) -> Result<Vec<ItemRow>> {
        items::select_items(conn, self.table(), filter)
    }

    /// Index the given files. See [`crate::sync`].
    pub fn sync<'a>(
        &'a self,
        conn: &'a Connection,
        file_paths: Vec<String>,
        options: SyncOptions,
    ) -> SyncStream<'a> {
        crate::sync::sync(self, conn, file_paths, options)
    }

    /// Remove rows whose files are not in `known_file_paths`. See
    /// [`crate::sync::prune`].
    ///
    /// # Errors
    ///
    /// Returns an error if the row snapshot cannot be read.
    pub fn prune<'a>(
        &'a self,
        conn: &'a Connection,
        known_file_paths: &[String],
        options: PruneOptions,
    ) -> Result<PruneStream<'a>> {
        crate::sync::prune::prune(self, conn, known_file_paths, options)
    }
}

/// Equality that treats `4` and `4.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::kinds::{Book, Game};
    use super::*;
    use crate::frontmatter::AssetSource;
    use crate::storage::SqliteStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn books(temp_dir: &TempDir) -> Piece {
        Piece::new(Book, temp_dir.path())
    }

    #[test]
    fn test_fields_memoized() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let first = piece.fields().unwrap().as_ptr();
        let second = piece.fields().unwrap().as_ptr();
        assert_eq!(first, second);
        assert_eq!(piece.fields().unwrap()[0].name, "title");
    }

    #[test]
    fn test_unknown_field() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece.create("dune", "Dune", vec![]).unwrap();

        let err = piece.set_field(&md, "colour", "blue").unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "colour"));

        let err = piece.remove_field(&md, "colour", None).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_set_fields_is_copy_on_write() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece.create("dune", "Dune", vec![]).unwrap();

        let updated = piece.set_field(&md, "year", "1965").unwrap();
        assert_eq!(updated.get("year"), Some(&json!(1965)));
        assert_eq!(md.get("year"), None);
    }

    #[test]
    fn test_array_set_semantics() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece.create("dune", "Dune", vec![]).unwrap();

        let one = piece.set_field(&md, "tags", "sf").unwrap();
        assert_eq!(one.get("tags"), Some(&json!(["sf"])));

        let replaced = piece.set_field(&one, "tags", vec!["classic", "desert"]).unwrap();
        assert_eq!(replaced.get("tags"), Some(&json!(["classic", "desert"])));
    }

    #[test]
    fn test_remove_semantics() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece
            .create(
                "dune",
                "Dune",
                vec![
                    ("tags".into(), vec!["sf", "classic"].into()),
                    ("rating".into(), "4.5".into()),
                ],
            )
            .unwrap();

        let fewer = piece.remove_field(&md, "tags", Some(json!("sf"))).unwrap();
        assert_eq!(fewer.get("tags"), Some(&json!(["classic"])));

        let none = piece.remove_field(&fewer, "tags", Some(json!("classic"))).unwrap();
        assert_eq!(none.get("tags"), None);

        // Scalar with a different expected value is left alone
        let kept = piece.remove_field(&md, "rating", Some(json!(3))).unwrap();
        assert_eq!(kept.get("rating"), Some(&json!(4.5)));

        let removed = piece.remove_field(&md, "rating", Some(json!("4.5"))).unwrap();
        assert_eq!(removed.get("rating"), None);

        let err = piece.remove_field(&md, "title", None).unwrap_err();
        assert!(matches!(err, Error::RequiredField { .. }));
    }

    #[test]
    fn test_remove_preserves_key_order() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece
            .create(
                "dune",
                "Dune",
                vec![("year".into(), "1965".into()), ("isbn".into(), "x".into())],
            )
            .unwrap();
        let removed = piece.remove_field(&md, "year", None).unwrap();
        assert_eq!(
            removed.frontmatter.keys().collect::<Vec<_>>(),
            vec!["title", "isbn"]
        );
    }

    #[test]
    fn test_create_rejects_existing() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        piece.create("dune", "Dune", vec![]).unwrap();
        let err = piece.create("dune", "Dune again", vec![]).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_write_rejects_invalid_and_reports_every_field() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let mut fm = Frontmatter::new();
        fm.insert("year".into(), json!("soon"));
        fm.insert("status".into(), json!("shelved"));
        let md = PieceMarkdown::new("book", "bad", fm, String::new()).unwrap();

        let err = piece.write(&md).unwrap_err();
        let Error::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/title", "/year", "/status"]);
        assert!(!temp_dir.path().join("book/bad.md").exists());
    }

    #[test]
    fn test_attachment_failure_leaves_document_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece.create("dune", "Dune", vec![]).unwrap();
        let before = std::fs::read_to_string(temp_dir.path().join("book/dune.md")).unwrap();

        let missing = temp_dir.path().join("missing.jpg");
        let err = piece
            .set_field(&md, "cover", AssetSource::Path(missing))
            .unwrap_err();
        assert!(matches!(err, Error::Attachment { .. }));

        let after = std::fs::read_to_string(temp_dir.path().join("book/dune.md")).unwrap();
        assert_eq!(before, after);
        assert_eq!(md.get("cover"), None);
    }

    #[test]
    fn test_asset_field_stores_content() {
        let temp_dir = TempDir::new().unwrap();
        let piece = books(&temp_dir);
        let md = piece.create("dune", "Dune", vec![]).unwrap();

        let image = temp_dir.path().join("cover.png");
        std::fs::write(&image, b"png bytes").unwrap();
        let with_cover = piece
            .set_field(&md, "cover", image.to_string_lossy().as_ref())
            .unwrap();

        let stored = with_cover.get("cover").and_then(Value::as_str).unwrap();
        assert!(stored.starts_with("assets/book/") && stored.ends_with(".png"));
        assert!(temp_dir.path().join(stored).exists());

        // Re-setting a stored path is a pass-through
        let again = piece.set_field(&with_cover, "cover", stored).unwrap();
        assert_eq!(again.get("cover"), with_cover.get("cover"));
    }

    #[test]
    fn test_get_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let piece = Piece::new(Game, temp_dir.path());
        let md = piece
            .create("celeste", "Celeste", vec![("hours".into(), "31.5".into())])
            .unwrap();
        let read = piece.get_by_slug("celeste").unwrap();
        assert_eq!(read, md);

        let err = piece.get("game/none.md").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_to_markdown_from_row() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let piece = books(&temp_dir);
        piece.ensure_table(storage.conn()).unwrap();

        let mut md = piece
            .create(
                "dune",
                "Dune",
                vec![
                    ("author".into(), "Frank Herbert".into()),
                    ("year".into(), "1965".into()),
                    ("rating".into(), "4.5".into()),
                ],
            )
            .unwrap();
        md.note = "Spice.\n".to_string();
        piece.write(&md).unwrap();

        let outcomes: Vec<_> = piece
            .sync(storage.conn(), vec![md.file_path.clone()], SyncOptions::default())
            .collect();
        assert!(outcomes[0].result.is_ok());

        let row = items::select_item(storage.conn(), "book", "book/dune.md")
            .unwrap()
            .unwrap();
        assert_eq!(piece.to_markdown(&row).unwrap(), md);
    }

    #[test]
    fn test_is_outdated() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let piece = books(&temp_dir);
        piece.ensure_table(storage.conn()).unwrap();
        let md = piece.create("dune", "Dune", vec![]).unwrap();

        assert!(piece.is_outdated(storage.conn(), &md.file_path).unwrap());

        piece
            .sync(storage.conn(), vec![md.file_path.clone()], SyncOptions::default())
            .for_each(drop);
        assert!(!piece.is_outdated(storage.conn(), &md.file_path).unwrap());
    }

    #[test]
    fn test_is_outdated_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let piece = books(&temp_dir);
        piece.ensure_table(storage.conn()).unwrap();

        let err = piece.is_outdated(storage.conn(), "book/ghost.md").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let conn = storage.conn();
        let piece = books(&temp_dir);
        piece.ensure_table(conn).unwrap();
        let md = piece.create("dune", "Dune", vec![]).unwrap();
        piece
            .sync(conn, vec![md.file_path.clone()], SyncOptions::default())
            .for_each(drop);

        piece.delete(conn, &md.file_path).unwrap();
        assert!(!temp_dir.path().join("book/dune.md").exists());
        assert!(items::select_item(conn, "book", &md.file_path).unwrap().is_none());
        assert!(cache::get(conn, &md.file_path).unwrap().is_none());

        let err = piece.delete(conn, &md.file_path).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    /// Local storage that refuses to delete anything.
    struct UndeletableStorage(LocalStorage);

    impl FileStorage for UndeletableStorage {
        fn resolve(&self, rel: &str) -> PathBuf {
            self.0.resolve(rel)
        }

        fn read(&self, rel: &str) -> Result<Vec<u8>> {
            self.0.read(rel)
        }

        fn write(&self, rel: &str, bytes: &[u8]) -> Result<()> {
            self.0.write(rel, bytes)
        }

        fn exists(&self, rel: &str) -> bool {
            self.0.exists(rel)
        }

        fn remove(&self, rel: &str) -> Result<()> {
            Err(Error::Other(format!("{rel} is read-only")))
        }

        fn modified(&self, rel: &str) -> Result<i64> {
            self.0.modified(rel)
        }

        fn list_markdown(&self, dir: &str) -> Result<Vec<String>> {
            self.0.list_markdown(dir)
        }
    }

    #[test]
    fn test_delete_keeps_row_when_file_removal_fails() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open_memory().unwrap();
        let conn = storage.conn();
        let piece = Piece::with_storage(
            Box::new(Book),
            Arc::new(UndeletableStorage(LocalStorage::new(temp_dir.path()))),
        );
        piece.ensure_table(conn).unwrap();
        let md = piece.create("dune", "Dune", vec![]).unwrap();
        piece
            .sync(conn, vec![md.file_path.clone()], SyncOptions::default())
            .for_each(drop);

        assert!(matches!(piece.delete(conn, &md.file_path), Err(Error::Other(_))));
        assert!(temp_dir.path().join("book/dune.md").exists());
        assert!(items::select_item(conn, "book", &md.file_path).unwrap().is_some());
        assert!(cache::get(conn, &md.file_path).unwrap().is_some());
    }

    #[test]
    fn test_reserved_field_name_rejected() {
        struct Bad;
        impl ContentType for Bad {
            fn name(&self) -> &'static str {
                "bad"
            }
            fn schema(&self) -> Value {
                json!({ "properties": { "note": { "type": "string" } } })
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let piece = Piece::new(Bad, temp_dir.path());
        assert!(matches!(piece.fields(), Err(Error::Config(_))));
    }
}
