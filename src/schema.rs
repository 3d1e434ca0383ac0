//! Frontmatter schemas.
//!
//! Each content type declares its frontmatter as a JSON-Type-Definition-like
//! document:
//!
//! ```json
//! {
//!   "properties": { "title": { "type": "string" } },
//!   "optionalProperties": {
//!     "tags": { "elements": { "type": "string" } },
//!     "cover": { "type": "string", "nullable": true, "metadata": { "format": "asset" } }
//!   }
//! }
//! ```
//!
//! The document is compiled once into a [`CompiledSchema`], which serves both
//! as the validator and as the ordered field reflection list.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::markdown::Frontmatter;

/// Scalar value types a field (or array element) can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    String,
    Boolean,
    /// Whole number within the declared JTD width.
    Integer { min: i64, max: i64 },
    Float,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date, stored as a string.
    Timestamp,
    Enum(Vec<String>),
}

impl ScalarType {
    fn from_jtd(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "int8" => Some(Self::integer(i8::MIN.into(), i8::MAX.into())),
            "uint8" => Some(Self::integer(0, u8::MAX.into())),
            "int16" => Some(Self::integer(i16::MIN.into(), i16::MAX.into())),
            "uint16" => Some(Self::integer(0, u16::MAX.into())),
            "int32" => Some(Self::integer(i32::MIN.into(), i32::MAX.into())),
            "uint32" => Some(Self::integer(0, u32::MAX.into())),
            "float32" | "float64" => Some(Self::Float),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }

    const fn integer(min: i64, max: i64) -> Self {
        Self::Integer { min, max }
    }

    /// Human-readable type name used in error messages and `fields` output.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Integer { .. } => "integer".to_string(),
            Self::Float => "float".to_string(),
            Self::Timestamp => "timestamp".to_string(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
        }
    }

    /// Check a single non-null value against this type.
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        let ok = match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Integer { min, max } => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => true,
                Some(_) => return Err(format!("integer {value} is outside {min}..={max}")),
                None if value.is_u64() => {
                    return Err(format!("integer {value} is outside {min}..={max}"));
                }
                None => false,
            },
            Self::Float => value.is_number(),
            Self::Timestamp => value.as_str().is_some_and(is_timestamp),
            Self::Enum(values) => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, found {}", self.label(), describe(value)))
        }
    }
}

/// Whether a field holds one value or a sequence of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Array,
}

/// Special value formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    /// The value is a path to a catalog-managed attachment.
    Asset,
}

/// One frontmatter field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub item_type: ScalarType,
    pub nullable: bool,
    /// Non-nullable, listed under `properties`, and without a default.
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind == FieldKind::Array
    }

    #[must_use]
    pub fn is_asset(&self) -> bool {
        self.format == Some(FieldFormat::Asset)
    }

    /// Validate a value for this field, pushing every problem into `errors`.
    fn check(&self, value: &Value, errors: &mut Vec<FieldError>) {
        let path = format!("/{}", self.name);
        if value.is_null() {
            if !self.nullable {
                errors.push(FieldError::new(path, "must not be null"));
            }
            return;
        }

        match self.kind {
            FieldKind::Scalar => {
                if let Err(message) = self.item_type.check(value) {
                    errors.push(FieldError::new(path, message));
                }
            }
            FieldKind::Array => {
                let Some(items) = value.as_array() else {
                    errors.push(FieldError::new(
                        path,
                        format!("expected array, found {}", describe(value)),
                    ));
                    return;
                };
                for (i, item) in items.iter().enumerate() {
                    if let Err(message) = self.item_type.check(item) {
                        errors.push(FieldError::new(format!("{path}/{i}"), message));
                    }
                }
            }
        }
    }
}

/// A single validation failure, addressed by JSON-pointer-style path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

/// Outcome of validating a frontmatter mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Convert into `Error::Validation` when invalid.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` carrying every field error.
    pub fn into_result(self, path: &str) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(Error::Validation {
                path: path.to_string(),
                errors: self.errors,
            })
        }
    }
}

// ── Schema document ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SchemaDoc {
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    optional_properties: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDoc {
    #[serde(rename = "type")]
    type_name: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<String>>,
    elements: Option<Box<TypeDoc>>,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    metadata: MetadataDoc,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataDoc {
    format: Option<String>,
    default: Option<Value>,
    description: Option<String>,
}

/// A schema compiled into an ordered list of field definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    fields: Vec<FieldDef>,
}

impl CompiledSchema {
    /// Compile a schema document.
    ///
    /// Fields are ordered required-first, each group in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for unknown types, nested arrays, unknown
    /// formats, duplicate names or names that are not SQL-safe identifiers.
    pub fn compile(doc: &Value) -> Result<Self> {
        let doc: SchemaDoc = serde_json::from_value(doc.clone())
            .map_err(|e| Error::Config(format!("invalid schema document: {e}")))?;

        let mut fields = Vec::new();
        let mut seen = HashSet::new();

        let groups = [(&doc.properties, true), (&doc.optional_properties, false)];
        for (group, listed_required) in groups {
            for (name, typedef) in group {
                if !is_identifier(name) {
                    return Err(Error::Config(format!(
                        "field name '{name}' must match [a-z_][a-z0-9_]*"
                    )));
                }
                if !seen.insert(name.clone()) {
                    return Err(Error::Config(format!("field '{name}' is declared twice")));
                }
                fields.push(compile_field(name, typedef, listed_required)?);
            }
        }

        Ok(Self { fields })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a frontmatter mapping, collecting every violation.
    #[must_use]
    pub fn validate(&self, frontmatter: &Frontmatter) -> ValidationReport {
        let mut errors = Vec::new();

        for field in &self.fields {
            match frontmatter.get(&field.name) {
                Some(value) => field.check(value, &mut errors),
                None if field.required => {
                    errors.push(FieldError::new(format!("/{}", field.name), "is required"));
                }
                None => {}
            }
        }

        for key in frontmatter.keys() {
            if self.field(key).is_none() {
                errors.push(FieldError::new(format!("/{key}"), "is not a known field"));
            }
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

fn compile_field(name: &str, typedef: &Value, listed_required: bool) -> Result<FieldDef> {
    let doc: TypeDoc = serde_json::from_value(typedef.clone())
        .map_err(|e| Error::Config(format!("field '{name}': {e}")))?;

    let (kind, item_doc) = match &doc.elements {
        Some(elements) => {
            if elements.elements.is_some() {
                return Err(Error::Config(format!(
                    "field '{name}': nested arrays are not supported"
                )));
            }
            (FieldKind::Array, elements.as_ref())
        }
        None => (FieldKind::Scalar, &doc),
    };

    let item_type = match (&item_doc.type_name, &item_doc.enum_values) {
        (Some(t), None) => ScalarType::from_jtd(t)
            .ok_or_else(|| Error::Config(format!("field '{name}': unknown type '{t}'")))?,
        (None, Some(values)) => ScalarType::Enum(values.clone()),
        _ => {
            return Err(Error::Config(format!(
                "field '{name}': exactly one of 'type' or 'enum' is required"
            )));
        }
    };

    let format = match doc.metadata.format.as_deref() {
        None => None,
        Some("asset") => Some(FieldFormat::Asset),
        Some(other) => {
            return Err(Error::Config(format!(
                "field '{name}': unknown format '{other}'"
            )));
        }
    };

    if format.is_some() && item_type != ScalarType::String {
        return Err(Error::Config(format!(
            "field '{name}': asset fields must be strings"
        )));
    }

    let default = doc.metadata.default;
    Ok(FieldDef {
        name: name.to_string(),
        kind,
        item_type,
        nullable: doc.nullable,
        required: listed_required && !doc.nullable && default.is_none(),
        format,
        default,
        description: doc.metadata.description,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_timestamp(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> CompiledSchema {
        CompiledSchema::compile(&json!({
            "properties": {
                "title": { "type": "string" },
                "status": { "enum": ["want", "reading", "read"], "metadata": { "default": "want" } }
            },
            "optionalProperties": {
                "tags": { "elements": { "type": "string" } },
                "rating": { "type": "float64", "nullable": true },
                "year_read": { "type": "int32" },
                "finished": { "type": "timestamp" },
                "cover": { "type": "string", "metadata": { "format": "asset" } }
            }
        }))
        .unwrap()
    }

    fn fm(value: Value) -> Frontmatter {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_compile_orders_and_flags_fields() {
        let schema = schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["title", "status", "tags", "rating", "year_read", "finished", "cover"]
        );

        let title = schema.field("title").unwrap();
        assert!(title.required);
        let status = schema.field("status").unwrap();
        assert!(!status.required, "defaulted fields are not required");
        assert!(schema.field("tags").unwrap().is_array());
        assert!(schema.field("cover").unwrap().is_asset());
    }

    #[test]
    fn test_valid_frontmatter() {
        let report = schema().validate(&fm(json!({
            "title": "Dune",
            "tags": ["sf"],
            "rating": null,
            "year_read": 2021,
            "finished": "2021-03-04"
        })));
        assert!(report.is_valid, "{:?}", report.errors);
    }

    #[test]
    fn test_reports_every_violation() {
        let report = schema().validate(&fm(json!({
            "tags": ["ok", 3],
            "year_read": "last year",
            "status": "lost",
            "bogus": true
        })));

        assert!(!report.is_valid);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/title", "/status", "/tags/1", "/year_read", "/bogus"]
        );
    }

    #[test]
    fn test_integer_width_is_enforced() {
        let report = schema().validate(&fm(json!({
            "title": "Dune",
            "year_read": 100_000_000_000_000_000_i64
        })));
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].path, "/year_read");
        assert!(report.errors[0].message.contains("outside"));

        let huge = schema().validate(&fm(json!({ "title": "Dune", "year_read": u64::MAX })));
        assert_eq!(huge.errors[0].path, "/year_read");

        let bytes = CompiledSchema::compile(&json!({
            "properties": { "level": { "type": "uint8" } }
        }))
        .unwrap();
        assert!(bytes.validate(&fm(json!({ "level": 255 }))).is_valid);
        assert!(!bytes.validate(&fm(json!({ "level": 256 }))).is_valid);
        assert!(!bytes.validate(&fm(json!({ "level": -1 }))).is_valid);
    }

    #[test]
    fn test_null_on_non_nullable() {
        let report = schema().validate(&fm(json!({ "title": null })));
        assert_eq!(report.errors, vec![FieldError::new("/title", "must not be null")]);
    }

    #[test]
    fn test_rejects_bad_names_and_duplicates() {
        let bad = CompiledSchema::compile(&json!({
            "properties": { "Title": { "type": "string" } }
        }));
        assert!(matches!(bad, Err(Error::Config(_))));

        let dup = CompiledSchema::compile(&json!({
            "properties": { "title": { "type": "string" } },
            "optionalProperties": { "title": { "type": "string" } }
        }));
        assert!(matches!(dup, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_type() {
        let res = CompiledSchema::compile(&json!({
            "properties": { "title": { "type": "text" } }
        }));
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
