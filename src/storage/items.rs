//! Item repository: row access for one content type's table.
//!
//! Every function is a single statement against a single table. Callers
//! that need several statements to land together wrap them in
//! [`with_transaction`](crate::storage::with_transaction).

use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::schema::{RESERVED_COLUMNS, quote_ident};

/// One item row.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub id: String,
    pub file_path: String,
    pub slug: String,
    pub frontmatter_json: String,
    pub note: String,
    pub date_added: i64,
    pub date_updated: Option<i64>,
    /// Content-type columns (frontmatter and derived fields) by name.
    pub columns: BTreeMap<String, SqlValue>,
}

impl ItemRow {
    /// A content-type column's value; absent columns read as NULL.
    #[must_use]
    pub fn column(&self, name: &str) -> &SqlValue {
        static NULL: SqlValue = SqlValue::Null;
        self.columns.get(name).unwrap_or(&NULL)
    }
}

/// Column values for an insert or update, in write order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemValues {
    columns: Vec<(String, SqlValue)>,
}

impl ItemValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value for the same name.
    pub fn set(&mut self, name: impl Into<String>, value: SqlValue) {
        let name = name.into();
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.columns.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Column names in write order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Keep only the columns whose value differs from `row`.
    #[must_use]
    pub fn diff_against(self, row: &ItemRow) -> Self {
        let columns = self
            .columns
            .into_iter()
            .filter(|(name, value)| current_value(row, name) != *value)
            .collect();
        Self { columns }
    }
}

fn current_value(row: &ItemRow, name: &str) -> SqlValue {
    match name {
        "id" => SqlValue::Text(row.id.clone()),
        "file_path" => SqlValue::Text(row.file_path.clone()),
        "slug" => SqlValue::Text(row.slug.clone()),
        "frontmatter_json" => SqlValue::Text(row.frontmatter_json.clone()),
        "note" => SqlValue::Text(row.note.clone()),
        "date_added" => SqlValue::Integer(row.date_added),
        "date_updated" => row.date_updated.map_or(SqlValue::Null, SqlValue::Integer),
        other => row.column(other).clone(),
    }
}

/// Filter for [`select_items`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemFilter {
    /// Restrict to these file paths.
    pub file_paths: Option<Vec<String>>,
    /// Case-insensitive substring match over frontmatter and note.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// Get the row for a file path.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn select_item(conn: &Connection, table: &str, file_path: &str) -> Result<Option<ItemRow>> {
    select_one(conn, table, "file_path", file_path)
}

/// Get a row by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn select_item_by_id(conn: &Connection, table: &str, id: &str) -> Result<Option<ItemRow>> {
    select_one(conn, table, "id", id)
}

fn select_one(conn: &Connection, table: &str, key: &str, value: &str) -> Result<Option<ItemRow>> {
    let sql = format!("SELECT * FROM {} WHERE {key} = ?1", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let names = column_names(&stmt);
    let row = stmt
        .query_row([value], |row| map_row(row, &names))
        .optional()?;
    Ok(row)
}

/// List rows matching a filter, ordered by file path.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn select_items(conn: &Connection, table: &str, filter: &ItemFilter) -> Result<Vec<ItemRow>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    if let Some(paths) = &filter.file_paths {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let start = params.len() + 1;
        let placeholders: Vec<String> = (start..start + paths.len()).map(|i| format!("?{i}")).collect();
        conditions.push(format!("file_path IN ({})", placeholders.join(", ")));
        params.extend(paths.iter().cloned().map(SqlValue::Text));
    }

    if let Some(term) = &filter.search {
        let idx = params.len() + 1;
        conditions.push(format!(
            "(frontmatter_json LIKE ?{idx} COLLATE NOCASE OR note LIKE ?{idx} COLLATE NOCASE)"
        ));
        params.push(SqlValue::Text(format!("%{term}%")));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let mut sql = format!(
        "SELECT * FROM {}{where_clause} ORDER BY file_path",
        quote_ident(table)
    );
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let names = column_names(&stmt);
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| map_row(row, &names))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Insert a row with a freshly generated id.
///
/// `values` must include `file_path`, `slug`, `frontmatter_json` and `note`.
///
/// # Errors
///
/// Returns an error if a required column is missing or the insert fails
/// (e.g. the file path is already indexed).
pub fn insert_item(conn: &Connection, table: &str, values: &ItemValues) -> Result<ItemRow> {
    for required in ["file_path", "slug", "frontmatter_json", "note"] {
        if !values.contains(required) {
            return Err(Error::InvalidArgument(format!(
                "insert into {table} is missing '{required}'"
            )));
        }
    }

    let id = generate_id();
    let now = chrono::Utc::now().timestamp_millis();

    let mut names = vec!["id".to_string(), "date_added".to_string()];
    let mut params = vec![SqlValue::Text(id.clone()), SqlValue::Integer(now)];
    for (name, value) in &values.columns {
        if name == "id" || name == "date_added" {
            continue;
        }
        names.push(quote_ident(name));
        params.push(value.clone());
    }

    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(params))?;

    select_item_by_id(conn, table, &id)?.ok_or(Error::NotFound { path: id })
}

/// Update the given columns of a row and stamp `date_updated`.
///
/// The id is immutable; an `id` entry in `values` is ignored.
///
/// # Errors
///
/// Returns `Error::NotFound` if no row has this id.
pub fn update_item(conn: &Connection, table: &str, id: &str, values: &ItemValues) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (name, value) in &values.columns {
        if name == "id" || name == "date_updated" {
            continue;
        }
        params.push(value.clone());
        assignments.push(format!("{} = ?{}", quote_ident(name), params.len()));
    }
    params.push(SqlValue::Integer(now));
    assignments.push(format!("date_updated = ?{}", params.len()));
    params.push(SqlValue::Text(id.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        quote_ident(table),
        assignments.join(", "),
        params.len()
    );
    let rows = conn.execute(&sql, rusqlite::params_from_iter(params))?;

    if rows == 0 {
        return Err(Error::NotFound {
            path: format!("{table}#{id}"),
        });
    }
    Ok(())
}

/// Delete rows by id. Unknown ids are ignored.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_items(conn: &Connection, table: &str, ids: &[String]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "DELETE FROM {} WHERE id IN ({})",
        quote_ident(table),
        placeholders.join(", ")
    );
    Ok(conn.execute(&sql, rusqlite::params_from_iter(ids))?)
}

fn generate_id() -> String {
    format!("item_{}", &uuid::Uuid::new_v4().simple().to_string()[..16])
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

fn map_row(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<ItemRow> {
    let mut columns = BTreeMap::new();
    for (idx, name) in names.iter().enumerate() {
        if !RESERVED_COLUMNS.contains(&name.as_str()) {
            columns.insert(name.clone(), row.get::<_, SqlValue>(idx)?);
        }
    }

    Ok(ItemRow {
        id: row.get("id")?,
        file_path: row.get("file_path")?,
        slug: row.get("slug")?,
        frontmatter_json: row.get("frontmatter_json")?,
        note: row.get("note")?,
        date_added: row.get("date_added")?,
        date_updated: row.get("date_updated")?,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use crate::storage::schema::{ColumnDef, ensure_item_table};

    fn setup() -> SqliteStorage {
        let storage = SqliteStorage::open_memory().unwrap();
        ensure_item_table(
            storage.conn(),
            "book",
            &[
                ColumnDef {
                    name: "title".into(),
                    sql_type: "TEXT",
                },
                ColumnDef {
                    name: "rating".into(),
                    sql_type: "REAL",
                },
            ],
        )
        .unwrap();
        storage
    }

    fn values(path: &str, title: &str) -> ItemValues {
        let mut v = ItemValues::new();
        v.set("file_path", SqlValue::Text(path.into()));
        v.set("slug", SqlValue::Text(path.trim_end_matches(".md").into()));
        v.set("frontmatter_json", SqlValue::Text(format!(r#"{{"title":"{title}"}}"#)));
        v.set("note", SqlValue::Text(String::new()));
        v.set("title", SqlValue::Text(title.into()));
        v
    }

    #[test]
    fn test_insert_and_select() {
        let storage = setup();
        let conn = storage.conn();

        let row = insert_item(conn, "book", &values("book/dune.md", "Dune")).unwrap();
        assert!(row.id.starts_with("item_"));
        assert_eq!(row.column("title"), &SqlValue::Text("Dune".into()));
        assert_eq!(row.column("rating"), &SqlValue::Null);
        assert_eq!(row.date_updated, None);

        let by_path = select_item(conn, "book", "book/dune.md").unwrap().unwrap();
        assert_eq!(by_path, row);
        assert!(select_item(conn, "book", "book/none.md").unwrap().is_none());
    }

    #[test]
    fn test_insert_requires_bookkeeping_columns() {
        let storage = setup();
        let mut v = ItemValues::new();
        v.set("title", SqlValue::Text("x".into()));
        let err = insert_item(storage.conn(), "book", &v).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_update_keeps_id() {
        let storage = setup();
        let conn = storage.conn();
        let row = insert_item(conn, "book", &values("book/dune.md", "Dune")).unwrap();

        let mut changes = ItemValues::new();
        changes.set("title", SqlValue::Text("Dune Messiah".into()));
        changes.set("id", SqlValue::Text("hijack".into()));
        update_item(conn, "book", &row.id, &changes).unwrap();

        let updated = select_item(conn, "book", "book/dune.md").unwrap().unwrap();
        assert_eq!(updated.id, row.id);
        assert_eq!(updated.column("title"), &SqlValue::Text("Dune Messiah".into()));
        assert!(updated.date_updated.is_some());
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let storage = setup();
        let err = update_item(storage.conn(), "book", "item_missing", &ItemValues::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_select_items_filters() {
        let storage = setup();
        let conn = storage.conn();
        for (path, title) in [("book/a.md", "Anathem"), ("book/b.md", "Blindsight"), ("book/c.md", "Consider Phlebas")] {
            insert_item(conn, "book", &values(path, title)).unwrap();
        }

        let all = select_items(conn, "book", &ItemFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let found = select_items(
            conn,
            "book",
            &ItemFilter {
                search: Some("blind".into()),
                ..ItemFilter::default()
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_path, "book/b.md");

        let by_path = select_items(
            conn,
            "book",
            &ItemFilter {
                file_paths: Some(vec!["book/a.md".into(), "book/c.md".into()]),
                limit: Some(1),
                ..ItemFilter::default()
            },
        )
        .unwrap();
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].file_path, "book/a.md");
    }

    #[test]
    fn test_delete_items() {
        let storage = setup();
        let conn = storage.conn();
        let a = insert_item(conn, "book", &values("book/a.md", "A")).unwrap();
        insert_item(conn, "book", &values("book/b.md", "B")).unwrap();

        assert_eq!(delete_items(conn, "book", &[a.id, "item_unknown".into()]).unwrap(), 1);
        assert_eq!(delete_items(conn, "book", &[]).unwrap(), 0);
        assert_eq!(select_items(conn, "book", &ItemFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_diff_against_row() {
        let storage = setup();
        let row = insert_item(storage.conn(), "book", &values("book/dune.md", "Dune")).unwrap();

        let mut next = values("book/dune.md", "Dune");
        next.set("rating", SqlValue::Real(4.5));
        let diff = next.diff_against(&row);
        assert_eq!(diff.names().collect::<Vec<_>>(), vec!["rating"]);
    }
}
