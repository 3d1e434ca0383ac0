//! Built-in content types.

use rusqlite::types::Value as SqlValue;
use serde_json::{Value, json};

use super::content_type::{ContentType, DerivedField};
use crate::markdown::Frontmatter;

/// Every built-in content type, in display order.
#[must_use]
pub fn all() -> Vec<Box<dyn ContentType>> {
    vec![
        Box::new(Book),
        Box::new(Game),
        Box::new(Link),
        Box::new(Text),
        Box::new(Film),
    ]
}

/// Look up a built-in content type by name.
#[must_use]
pub fn by_name(name: &str) -> Option<Box<dyn ContentType>> {
    all().into_iter().find(|kind| kind.name() == name)
}

/// Names of the built-in content types.
#[must_use]
pub fn names() -> Vec<&'static str> {
    all().iter().map(|kind| kind.name()).collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Book;

impl ContentType for Book {
    fn name(&self) -> &'static str {
        "book"
    }

    fn schema(&self) -> Value {
        json!({
            "properties": {
                "title": { "type": "string" }
            },
            "optionalProperties": {
                "subtitle": { "type": "string" },
                "author": { "elements": { "type": "string" } },
                "year": { "type": "int32", "nullable": true },
                "isbn": { "type": "string" },
                "publisher": { "type": "string" },
                "pages": { "type": "int32" },
                "cover": {
                    "type": "string",
                    "nullable": true,
                    "metadata": { "format": "asset", "description": "Cover image" }
                },
                "status": {
                    "enum": ["to-read", "reading", "read", "abandoned"],
                    "metadata": { "default": "to-read" }
                },
                "rating": { "type": "float64", "nullable": true },
                "year_read": { "type": "int32", "nullable": true },
                "month_read": {
                    "type": "int32",
                    "nullable": true,
                    "metadata": { "description": "1-12" }
                },
                "tags": { "elements": { "type": "string" } },
                "url": { "type": "string" }
            }
        })
    }

    fn derived_fields(&self) -> Vec<DerivedField> {
        vec![DerivedField {
            name: "read_order",
            sql_type: "INTEGER",
            depends_on: &["year_read", "month_read"],
            compute: read_order,
        }]
    }
}

/// Sort key for reading history: `yyyymm`, month 0 when only the year is known.
fn read_order(frontmatter: &Frontmatter) -> SqlValue {
    let Some(year) = frontmatter.get("year_read").and_then(Value::as_i64) else {
        return SqlValue::Null;
    };
    let month = frontmatter
        .get("month_read")
        .and_then(Value::as_i64)
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(0);
    year.checked_mul(100)
        .and_then(|order| order.checked_add(month))
        .map_or(SqlValue::Null, SqlValue::Integer)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Game;

impl ContentType for Game {
    fn name(&self) -> &'static str {
        "game"
    }

    fn schema(&self) -> Value {
        json!({
            "properties": {
                "title": { "type": "string" }
            },
            "optionalProperties": {
                "platform": { "elements": { "type": "string" } },
                "developer": { "type": "string" },
                "year": { "type": "int32", "nullable": true },
                "cover": {
                    "type": "string",
                    "nullable": true,
                    "metadata": { "format": "asset" }
                },
                "status": {
                    "enum": ["backlog", "playing", "played", "abandoned"],
                    "metadata": { "default": "backlog" }
                },
                "rating": { "type": "float64", "nullable": true },
                "hours": { "type": "float64" },
                "tags": { "elements": { "type": "string" } }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Link;

impl ContentType for Link {
    fn name(&self) -> &'static str {
        "link"
    }

    fn schema(&self) -> Value {
        json!({
            "properties": {
                "title": { "type": "string" },
                "url": { "type": "string" }
            },
            "optionalProperties": {
                "description": { "type": "string" },
                "date_saved": { "type": "timestamp" },
                "archived": { "type": "boolean", "metadata": { "default": false } },
                "screenshot": {
                    "type": "string",
                    "nullable": true,
                    "metadata": { "format": "asset" }
                },
                "tags": { "elements": { "type": "string" } }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl ContentType for Text {
    fn name(&self) -> &'static str {
        "text"
    }

    fn schema(&self) -> Value {
        json!({
            "properties": {
                "title": { "type": "string" }
            },
            "optionalProperties": {
                "author": { "elements": { "type": "string" } },
                "kind": { "enum": ["article", "essay", "paper", "poem", "story"] },
                "source": { "type": "string" },
                "url": { "type": "string" },
                "year": { "type": "int32", "nullable": true },
                "date_read": { "type": "timestamp" },
                "tags": { "elements": { "type": "string" } }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Film;

impl ContentType for Film {
    fn name(&self) -> &'static str {
        "film"
    }

    fn schema(&self) -> Value {
        json!({
            "properties": {
                "title": { "type": "string" }
            },
            "optionalProperties": {
                "director": { "elements": { "type": "string" } },
                "year": { "type": "int32", "nullable": true },
                "poster": {
                    "type": "string",
                    "nullable": true,
                    "metadata": { "format": "asset" }
                },
                "rating": { "type": "float64", "nullable": true },
                "date_watched": { "type": "timestamp" },
                "tags": { "elements": { "type": "string" } }
            }
        })
    }
}
