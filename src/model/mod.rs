//! Data models for Shelf.
//!
//! [`PieceMarkdown`] is the in-memory form of one catalog file. It is a
//! plain value: every mutation in [`crate::piece`] returns a new one.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::markdown::{self, Frontmatter};

/// One markdown document of a content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceMarkdown {
    /// `<piece>/<slug>.md`, relative to the catalog root.
    pub file_path: String,

    /// Content-type name (e.g. "book").
    pub piece: String,

    pub slug: String,

    /// Field values, in document order.
    pub frontmatter: Frontmatter,

    /// Markdown body after the frontmatter block.
    pub note: String,
}

impl PieceMarkdown {
    /// Build a document for a slug, deriving its file path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the slug is not a valid file stem.
    pub fn new(piece: &str, slug: &str, frontmatter: Frontmatter, note: String) -> Result<Self> {
        validate_slug(slug)?;
        Ok(Self {
            file_path: file_path_for(piece, slug),
            piece: piece.to_string(),
            slug: slug.to_string(),
            frontmatter,
            note,
        })
    }

    /// Parse raw file content read from `file_path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` for malformed frontmatter and
    /// `Error::InvalidArgument` if the path does not name a markdown file.
    pub fn from_raw(piece: &str, file_path: &str, raw: &str) -> Result<Self> {
        let slug = slug_from_path(file_path).ok_or_else(|| {
            Error::InvalidArgument(format!("not a markdown file path: {file_path}"))
        })?;
        let extracted = markdown::extract(raw, file_path)?;
        Ok(Self {
            file_path: file_path.to_string(),
            piece: piece.to_string(),
            slug: slug.to_string(),
            frontmatter: extracted.frontmatter,
            note: extracted.note,
        })
    }

    /// Render back to file content.
    ///
    /// # Errors
    ///
    /// Returns an error if the frontmatter cannot be serialized.
    pub fn to_raw(&self) -> Result<String> {
        markdown::serialize(&self.frontmatter, &self.note)
    }

    /// Copy of this document with different frontmatter.
    #[must_use]
    pub fn with_frontmatter(&self, frontmatter: Frontmatter) -> Self {
        Self {
            frontmatter,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.frontmatter.get(field)
    }

    /// The `title` field when it is a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }
}

/// `<piece>/<slug>.md`
#[must_use]
pub fn file_path_for(piece: &str, slug: &str) -> String {
    format!("{piece}/{slug}.md")
}

/// File stem of a `.md` path.
#[must_use]
pub fn slug_from_path(file_path: &str) -> Option<&str> {
    let name = file_path.rsplit('/').next()?;
    name.strip_suffix(".md").filter(|stem| !stem.is_empty())
}

/// Slugs are lowercase ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` describing the problem.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(Error::InvalidArgument("slug cannot be empty".to_string()));
    }
    if slug.starts_with(['-', '_']) {
        return Err(Error::InvalidArgument(format!(
            "slug '{slug}' must start with a letter or digit"
        )));
    }
    if let Some(bad) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(Error::InvalidArgument(format!(
            "slug '{slug}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}
