//! Asset field resolution.
//!
//! An asset field's input is a local path, a remote URL, or an open reader.
//! Its bytes are stored under `assets/<piece>/<sha256>.<ext>` in the catalog
//! and the frontmatter keeps that relative path. Identical content always
//! maps to the same name, so re-setting an unchanged cover is a no-op write.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::FieldDef;
use crate::storage::FileStorage;
use crate::sync::{content_hash, reader_hash};

const ASSET_DIR: &str = "assets";

/// Where asset content comes from.
pub enum AssetSource {
    Path(PathBuf),
    Url(String),
    Reader {
        reader: Box<dyn Read + Send>,
        /// Extension for the stored file; `bin` when absent.
        extension: Option<String>,
    },
}

impl AssetSource {
    /// Interpret a user-supplied string as a URL or a local path.
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    /// Short description for errors and logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Reader { .. } => "stream".to_string(),
        }
    }

    fn extension(&self) -> Option<String> {
        match self {
            Self::Path(path) => extension_of(path),
            Self::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                let last = path.rsplit('/').next().unwrap_or(path);
                extension_of(Path::new(last))
            }
            Self::Reader { extension, .. } => extension.clone(),
        }
    }
}

/// Where resolved assets are stored.
pub struct AssetContext<'a> {
    pub storage: &'a dyn FileStorage,
    /// Content-type name; assets are grouped per type.
    pub piece: &'a str,
}

impl AssetContext<'_> {
    /// Whether `location` already names a stored asset of this piece type.
    #[must_use]
    pub fn is_stored(&self, location: &str) -> bool {
        location.starts_with(&format!("{ASSET_DIR}/{}/", self.piece)) && self.storage.exists(location)
    }
}

/// Asset content once its source has been read or hashed.
enum Content {
    /// Copied into the catalog only if not stored yet.
    Local(PathBuf),
    Bytes(Vec<u8>),
}

/// Read the source's bytes and store them, returning the relative path.
///
/// # Errors
///
/// Returns `Error::Attachment` if the source cannot be read or the content
/// cannot be written. Nothing is written on failure.
pub fn resolve_asset(field: &FieldDef, source: AssetSource, ctx: &AssetContext<'_>) -> Result<String> {
    let source_desc = source.describe();
    let extension = source.extension().unwrap_or_else(|| "bin".to_string());
    let attachment_error = |message: String| Error::Attachment {
        field: field.name.clone(),
        source_desc: source_desc.clone(),
        message,
    };

    let (content, hash) = match source {
        AssetSource::Path(path) => {
            let hash = std::fs::File::open(&path)
                .and_then(reader_hash)
                .map_err(|e| attachment_error(e.to_string()))?;
            (Content::Local(path), hash)
        }
        AssetSource::Url(url) => {
            let bytes = fetch_url(&url).map_err(attachment_error)?;
            let hash = content_hash(&bytes);
            (Content::Bytes(bytes), hash)
        }
        AssetSource::Reader { mut reader, .. } => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| attachment_error(e.to_string()))?;
            let hash = content_hash(&buf);
            (Content::Bytes(buf), hash)
        }
    };

    let rel = format!("{ASSET_DIR}/{}/{hash}.{}", ctx.piece, extension.to_lowercase());

    if ctx.storage.exists(&rel) {
        debug!(field = %field.name, path = %rel, "Asset already stored");
    } else {
        match &content {
            Content::Local(path) => ctx.storage.copy(path, &rel),
            Content::Bytes(bytes) => ctx.storage.write(&rel, bytes),
        }
        .map_err(|e| attachment_error(e.to_string()))?;
        debug!(field = %field.name, path = %rel, "Stored asset");
    }

    Ok(rel)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

/// Download a URL's body on a short-lived runtime.
fn fetch_url(url: &str) -> std::result::Result<Vec<u8>, String> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("failed to create runtime: {e}"))?;

    rt.block_on(async {
        let response = reqwest::get(url)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.to_string())?;
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(body.to_vec())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CompiledSchema;
    use crate::storage::LocalStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn cover_field() -> FieldDef {
        CompiledSchema::compile(&json!({
            "optionalProperties": {
                "cover": { "type": "string", "metadata": { "format": "asset" } }
            }
        }))
        .unwrap()
        .field("cover")
        .unwrap()
        .clone()
    }

    #[test]
    fn test_path_source_is_copied_by_hash() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("Cover.JPG");
        std::fs::write(&source, b"jpeg bytes").unwrap();

        let storage = LocalStorage::new(temp_dir.path().join("catalog"));
        let ctx = AssetContext {
            storage: &storage,
            piece: "book",
        };

        let rel = resolve_asset(&cover_field(), AssetSource::Path(source), &ctx).unwrap();
        assert_eq!(rel, format!("assets/book/{}.jpg", content_hash(b"jpeg bytes")));
        assert_eq!(storage.read(&rel).unwrap(), b"jpeg bytes");
        assert!(ctx.is_stored(&rel));
    }

    #[test]
    fn test_reader_source() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let ctx = AssetContext {
            storage: &storage,
            piece: "film",
        };

        let source = AssetSource::Reader {
            reader: Box::new(std::io::Cursor::new(b"png".to_vec())),
            extension: Some("png".to_string()),
        };
        let rel = resolve_asset(&cover_field(), source, &ctx).unwrap();
        assert!(rel.starts_with("assets/film/") && rel.ends_with(".png"));
    }

    #[test]
    fn test_missing_path_is_attachment_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let ctx = AssetContext {
            storage: &storage,
            piece: "book",
        };

        let err = resolve_asset(
            &cover_field(),
            AssetSource::Path(temp_dir.path().join("nope.jpg")),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Attachment { ref field, .. } if field == "cover"));
        assert!(!temp_dir.path().join("assets").exists());
    }

    #[test]
    fn test_url_extension() {
        let source = AssetSource::from_location("https://example.com/covers/dune.webp?size=large");
        assert_eq!(source.extension().as_deref(), Some("webp"));
        assert!(matches!(
            AssetSource::from_location("./cover.png"),
            AssetSource::Path(_)
        ));
    }
}
