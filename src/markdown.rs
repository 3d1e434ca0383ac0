//! Markdown + YAML frontmatter codec.
//!
//! A catalog file is UTF-8 text with an optional leading YAML block
//! delimited by `---` lines, followed by the markdown body (the "note"):
//!
//! ```text
//! ---
//! title: Dune
//! authors:
//! - Frank Herbert
//! ---
//! Re-read every few years.
//! ```
//!
//! Frontmatter values are held as `serde_json::Value` so the schema layer
//! and the database codec share one value model. Key order is preserved.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Ordered frontmatter mapping (field name → value).
pub type Frontmatter = Map<String, Value>;

const DELIMITER: &str = "---";

/// Frontmatter and body split out of a raw file.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub frontmatter: Frontmatter,
    pub note: String,
}

/// Split raw text into frontmatter and note.
///
/// `origin` names the source in parse errors (usually the file path).
///
/// # Errors
///
/// Returns `Error::Parse` if the frontmatter block is never closed, is not
/// valid YAML, or is not a mapping.
pub fn extract(raw: &str, origin: &str) -> Result<Extracted> {
    let Some(rest) = strip_delimiter_line(raw) else {
        return Ok(Extracted {
            frontmatter: Frontmatter::new(),
            note: raw.to_string(),
        });
    };

    let mut offset = 0;
    let mut closing = None;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((yaml_end, body_start)) = closing else {
        return Err(Error::Parse {
            path: origin.to_string(),
            message: "frontmatter block is not closed with '---'".to_string(),
        });
    };

    let yaml = &rest[..yaml_end];
    let frontmatter = parse_yaml(yaml, origin)?;

    Ok(Extracted {
        frontmatter,
        note: rest[body_start..].to_string(),
    })
}

/// Render frontmatter and note back into file text.
///
/// An empty frontmatter produces the note alone, so files without a
/// frontmatter block round-trip unchanged.
///
/// # Errors
///
/// Returns an error if a value cannot be represented as YAML.
pub fn serialize(frontmatter: &Frontmatter, note: &str) -> Result<String> {
    if frontmatter.is_empty() {
        return Ok(note.to_string());
    }

    let yaml = serde_yaml::to_string(frontmatter)?;
    let mut out = String::with_capacity(yaml.len() + note.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(note);
    Ok(out)
}

/// Returns the text after an opening `---` line, if present.
fn strip_delimiter_line(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix(DELIMITER)?;
    rest.strip_prefix('\n')
        .or_else(|| rest.strip_prefix("\r\n"))
}

fn parse_yaml(yaml: &str, origin: &str) -> Result<Frontmatter> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| Error::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Frontmatter::new()),
        other => Err(Error::Parse {
            path: origin.to_string(),
            message: format!("frontmatter must be a mapping, found {}", kind_of(&other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
