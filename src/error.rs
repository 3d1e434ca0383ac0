//! Error types for Shelf.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::FieldError;

/// Result type alias for Shelf operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    DatabaseError,

    // Not Found (exit 3)
    NotFound,
    AlreadyExists,

    // Validation (exit 4)
    ParseError,
    ValidationError,
    UnknownField,
    RequiredField,
    InvalidArgument,

    // Attachment (exit 5)
    AttachmentError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ParseError => "PARSE_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::UnknownField => "UNKNOWN_FIELD",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AttachmentError => "ATTACHMENT_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError => 2,
            Self::NotFound | Self::AlreadyExists => 3,
            Self::ParseError
            | Self::ValidationError
            | Self::UnknownField
            | Self::RequiredField
            | Self::InvalidArgument => 4,
            Self::AttachmentError => 5,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ParseError
                | Self::ValidationError
                | Self::UnknownField
                | Self::RequiredField
                | Self::InvalidArgument
                | Self::AttachmentError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Shelf operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `shelf init` first")]
    NotInitialized,

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid frontmatter in {path}: {}", format_field_errors(errors))]
    Validation {
        path: String,
        errors: Vec<FieldError>,
    },

    #[error("Unknown field '{field}' for {piece}")]
    UnknownField {
        piece: String,
        field: String,
        /// Field names the schema does define, for hint display.
        known: Vec<String>,
    },

    #[error("Field '{field}' is required and cannot be removed")]
    RequiredField { field: String },

    #[error("Could not resolve attachment for '{field}' from {source_desc}: {message}")]
    Attachment {
        field: String,
        source_desc: String,
        message: String,
    },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::Parse { .. } | Self::Yaml(_) => ErrorCode::ParseError,
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::UnknownField { .. } => ErrorCode::UnknownField,
            Self::RequiredField { .. } => ErrorCode::RequiredField,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Attachment { .. } => ErrorCode::AttachmentError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `shelf init` to create the catalog database".to_string())
            }

            Self::UnknownField { piece, known, .. } => Some(format!(
                "Fields for {piece}: {}. Use `shelf fields {piece}` for details.",
                known.join(", ")
            )),

            Self::RequiredField { field } => Some(format!(
                "Set a new value with `shelf set <kind> <slug> {field} <value>` instead."
            )),

            Self::Validation { errors, .. } if errors.len() > 1 => Some(format!(
                "{} fields failed validation; fix all of them before saving.",
                errors.len()
            )),

            Self::NotFound { .. } => Some(
                "Check the slug and kind. `shelf list <kind>` shows indexed items.".to_string(),
            ),

            Self::AlreadyExists { .. } => {
                Some("Use `shelf set` to modify an existing item.".to_string())
            }

            Self::Validation { .. }
            | Self::Parse { .. }
            | Self::Attachment { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::Validation { errors, .. } = self {
            obj["error"]["fields"] = serde_json::json!(errors);
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(
            Error::NotFound {
                path: "book/x.md".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            Error::RequiredField {
                field: "title".into()
            }
            .exit_code(),
            4
        );
    }

    #[test]
    fn test_structured_json_lists_every_field() {
        let err = Error::Validation {
            path: "book/dune.md".into(),
            errors: vec![
                FieldError::new("/title", "is required"),
                FieldError::new("/rating", "expected float64"),
            ],
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["fields"].as_array().unwrap().len(), 2);
        assert!(json["error"]["hint"].is_string());
    }
}
