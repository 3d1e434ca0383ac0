//! Conversion between frontmatter values and database columns.
//!
//! Frontmatter values are JSON-typed (`serde_json::Value`); database columns
//! are SQLite values. Array fields are stored as JSON text, booleans as
//! integers, asset fields as the stored relative path.
//!
//! [`make_piece_value`] is the entry point for values coming from users: it
//! coerces loose input to the field's type and resolves asset fields into
//! stored attachments.

mod asset;

pub use asset::{AssetContext, AssetSource, resolve_asset};

use rusqlite::types::Value as SqlValue;
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::schema::{FieldDef, FieldKind, ScalarType};

/// A value supplied for a field by a caller.
pub enum FieldInput {
    /// A plain value; strings are coerced to the field's type.
    Value(Value),
    /// Content for an asset field.
    Asset(AssetSource),
}

impl std::fmt::Debug for FieldInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Asset(source) => f.debug_tuple("Asset").field(&source.describe()).finish(),
        }
    }
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for FieldInput {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Vec<&str>> for FieldInput {
    fn from(values: Vec<&str>) -> Self {
        Self::Value(Value::Array(
            values.into_iter().map(|v| Value::String(v.to_string())).collect(),
        ))
    }
}

impl From<AssetSource> for FieldInput {
    fn from(source: AssetSource) -> Self {
        Self::Asset(source)
    }
}

/// SQLite column type for a field.
#[must_use]
pub fn sql_type(field: &FieldDef) -> &'static str {
    if field.is_array() {
        return "TEXT";
    }
    match field.item_type {
        ScalarType::Boolean | ScalarType::Integer { .. } => "INTEGER",
        ScalarType::Float => "REAL",
        ScalarType::String | ScalarType::Timestamp | ScalarType::Enum(_) => "TEXT",
    }
}

/// Convert a stored column value into its frontmatter representation.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if the stored value does not fit the
/// field's type (e.g. a BLOB, or malformed JSON in an array column).
pub fn database_value_to_frontmatter_value(field: &FieldDef, raw: &SqlValue) -> Result<Value> {
    if matches!(raw, SqlValue::Null) {
        return Ok(Value::Null);
    }

    if field.is_array() {
        let SqlValue::Text(json) = raw else {
            return Err(mismatch(field, "stored array must be JSON text"));
        };
        let items: Value = serde_json::from_str(json)?;
        if !items.is_array() {
            return Err(mismatch(field, "stored JSON is not an array"));
        }
        return Ok(items);
    }

    match (&field.item_type, raw) {
        (ScalarType::Boolean, SqlValue::Integer(i)) => Ok(Value::Bool(*i != 0)),
        (ScalarType::Integer { .. }, SqlValue::Integer(i)) => Ok(Value::from(*i)),
        (ScalarType::Float, SqlValue::Integer(i)) => Ok(Value::from(*i)),
        (ScalarType::Float, SqlValue::Real(f)) => float_value(field, *f),
        (
            ScalarType::String | ScalarType::Timestamp | ScalarType::Enum(_),
            SqlValue::Text(s),
        ) => Ok(Value::String(s.clone())),
        _ => Err(mismatch(field, "stored value has the wrong column type")),
    }
}

/// Convert a frontmatter value into a column value.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if the value does not fit the field.
pub fn frontmatter_value_to_database_value(field: &FieldDef, value: &Value) -> Result<SqlValue> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    if field.is_array() {
        if !value.is_array() {
            return Err(mismatch(field, "expected an array"));
        }
        return Ok(SqlValue::Text(serde_json::to_string(value)?));
    }

    match (&field.item_type, value) {
        (ScalarType::Boolean, Value::Bool(b)) => Ok(SqlValue::Integer(i64::from(*b))),
        (ScalarType::Integer { .. }, Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Integer)
            .ok_or_else(|| mismatch(field, "expected an integer")),
        (ScalarType::Float, Value::Number(n)) => n
            .as_f64()
            .map(SqlValue::Real)
            .ok_or_else(|| mismatch(field, "expected a number")),
        (
            ScalarType::String | ScalarType::Timestamp | ScalarType::Enum(_),
            Value::String(s),
        ) => Ok(SqlValue::Text(s.clone())),
        _ => Err(mismatch(field, &format!("expected {}", field.item_type.label()))),
    }
}

/// Coerce loose input into the field's declared type.
///
/// Scalars given for an array field become a one-element array; arrays are
/// coerced element-wise. `null` passes through (nullability is the
/// validator's concern).
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if a value cannot be converted, or an
/// array is given for a scalar field.
pub fn coerce(field: &FieldDef, value: Value) -> Result<Value> {
    match (field.kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (FieldKind::Array, Value::Array(items)) => items
            .into_iter()
            .map(|item| coerce_scalar(field, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        (FieldKind::Array, scalar) => Ok(Value::Array(vec![coerce_scalar(field, scalar)?])),
        (FieldKind::Scalar, Value::Array(_)) => {
            Err(mismatch(field, "takes a single value, not a list"))
        }
        (FieldKind::Scalar, scalar) => coerce_scalar(field, scalar),
    }
}

/// Resolve a caller-supplied input into the value stored in frontmatter.
///
/// Ordinary fields are coerced; asset fields copy or download their content
/// into catalog storage and yield the stored relative path.
///
/// # Errors
///
/// Returns `Error::Attachment` if asset content cannot be read or stored,
/// and `Error::InvalidArgument` for values that do not fit the field.
pub fn make_piece_value(field: &FieldDef, input: FieldInput, ctx: &AssetContext<'_>) -> Result<Value> {
    if !field.is_asset() {
        return match input {
            FieldInput::Value(value) => coerce(field, value),
            FieldInput::Asset(_) => Err(mismatch(field, "is not an asset field")),
        };
    }

    match input {
        FieldInput::Asset(source) => {
            let stored = resolve_asset(field, source, ctx)?;
            Ok(wrap_for_kind(field, Value::String(stored)))
        }
        FieldInput::Value(Value::Null) => Ok(Value::Null),
        FieldInput::Value(Value::Array(items)) if field.is_array() => {
            let mut stored = Vec::with_capacity(items.len());
            for item in items {
                stored.push(resolve_asset_value(field, item, ctx)?);
            }
            Ok(Value::Array(stored))
        }
        FieldInput::Value(Value::Array(_)) => {
            Err(mismatch(field, "takes a single value, not a list"))
        }
        FieldInput::Value(value) => {
            let stored = resolve_asset_value(field, value, ctx)?;
            Ok(wrap_for_kind(field, stored))
        }
    }
}

fn resolve_asset_value(field: &FieldDef, value: Value, ctx: &AssetContext<'_>) -> Result<Value> {
    let Value::String(s) = value else {
        return Err(mismatch(field, "expected a path or URL"));
    };
    if ctx.is_stored(&s) {
        return Ok(Value::String(s));
    }
    let stored = resolve_asset(field, AssetSource::from_location(&s), ctx)?;
    Ok(Value::String(stored))
}

fn wrap_for_kind(field: &FieldDef, value: Value) -> Value {
    if field.is_array() {
        Value::Array(vec![value])
    } else {
        value
    }
}

fn coerce_scalar(field: &FieldDef, value: Value) -> Result<Value> {
    let coerced = match (&field.item_type, value) {
        (ScalarType::String, Value::String(s)) => Some(Value::String(s)),
        (ScalarType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ScalarType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ScalarType::Boolean, Value::Bool(b)) => Some(Value::Bool(b)),
        (ScalarType::Boolean, Value::String(s)) => parse_bool(&s).map(Value::Bool),

        (ScalarType::Integer { .. }, Value::Number(n)) => integer_of(&n),
        (ScalarType::Integer { .. }, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(Value::from)
        }

        (ScalarType::Float, Value::Number(n)) => Some(Value::Number(n)),
        (ScalarType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ScalarType::Timestamp, Value::String(s)) => {
            let valid = chrono::DateTime::parse_from_rfc3339(&s).is_ok()
                || chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").is_ok();
            valid.then_some(Value::String(s))
        }

        (ScalarType::Enum(values), Value::String(s)) => values
            .iter()
            .find(|v| v.eq_ignore_ascii_case(s.trim()))
            .map(|v| Value::String(v.clone())),

        _ => None,
    };

    coerced.ok_or_else(|| mismatch(field, &format!("expected {}", field.item_type.label())))
}

fn integer_of(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    let f = n.as_f64()?;
    #[allow(clippy::cast_possible_truncation)]
    let truncated = f as i64;
    #[allow(clippy::cast_precision_loss)]
    let exact = (truncated as f64 - f).abs() < f64::EPSILON;
    exact.then(|| Value::from(truncated))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn float_value(field: &FieldDef, f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| mismatch(field, "stored number is not finite"))
}

fn mismatch(field: &FieldDef, message: &str) -> Error {
    Error::InvalidArgument(format!("field '{}' {message}", field.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CompiledSchema;
    use serde_json::json;

    fn schema() -> CompiledSchema {
        CompiledSchema::compile(&json!({
            "properties": { "title": { "type": "string" } },
            "optionalProperties": {
                "tags": { "elements": { "type": "string" } },
                "year_read": { "type": "int32" },
                "rating": { "type": "float64" },
                "owned": { "type": "boolean" },
                "status": { "enum": ["want", "read"] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_coerce_cli_strings() {
        let schema = schema();
        let f = |name: &str| schema.field(name).unwrap().clone();

        assert_eq!(coerce(&f("year_read"), json!("2021")).unwrap(), json!(2021));
        assert_eq!(coerce(&f("rating"), json!("4.5")).unwrap(), json!(4.5));
        assert_eq!(coerce(&f("owned"), json!("yes")).unwrap(), json!(true));
        assert_eq!(coerce(&f("status"), json!("READ")).unwrap(), json!("read"));
        assert!(coerce(&f("year_read"), json!("soon")).is_err());
    }

    #[test]
    fn test_coerce_scalar_into_array_field() {
        let schema = schema();
        let tags = schema.field("tags").unwrap();
        assert_eq!(coerce(tags, json!("x")).unwrap(), json!(["x"]));
        assert_eq!(coerce(tags, json!(["a", "b"])).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_coerce_array_into_scalar_field_fails() {
        let schema = schema();
        let err = coerce(schema.field("title").unwrap(), json!(["a"])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_database_conversions() {
        let schema = schema();
        let tags = schema.field("tags").unwrap();
        let owned = schema.field("owned").unwrap();
        let rating = schema.field("rating").unwrap();

        let stored = frontmatter_value_to_database_value(tags, &json!(["a", "b"])).unwrap();
        assert_eq!(stored, SqlValue::Text(r#"["a","b"]"#.to_string()));
        assert_eq!(
            database_value_to_frontmatter_value(tags, &stored).unwrap(),
            json!(["a", "b"])
        );

        assert_eq!(
            frontmatter_value_to_database_value(owned, &json!(true)).unwrap(),
            SqlValue::Integer(1)
        );
        assert_eq!(
            database_value_to_frontmatter_value(owned, &SqlValue::Integer(0)).unwrap(),
            json!(false)
        );
        assert_eq!(
            database_value_to_frontmatter_value(rating, &SqlValue::Real(3.5)).unwrap(),
            json!(3.5)
        );
        assert_eq!(
            database_value_to_frontmatter_value(rating, &SqlValue::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_sql_types() {
        let schema = schema();
        assert_eq!(sql_type(schema.field("tags").unwrap()), "TEXT");
        assert_eq!(sql_type(schema.field("owned").unwrap()), "INTEGER");
        assert_eq!(sql_type(schema.field("rating").unwrap()), "REAL");
    }
}
