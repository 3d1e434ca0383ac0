//! Shelf - a markdown-first catalog of books, games, links, texts and films
//!
//! Markdown files with YAML frontmatter are the source of truth. A SQLite
//! database indexes them for listing and search and is kept current by
//! content-hash based sync.
//!
//! # Architecture
//!
//! - [`markdown`] - Frontmatter/note codec
//! - [`schema`] - Frontmatter schemas and validation
//! - [`frontmatter`] - Value conversion and asset fields
//! - [`model`] - The in-memory document type
//! - [`piece`] - Content types, mutation API and file operations
//! - [`storage`] - Catalog files, content cache and item tables
//! - [`sync`] - Sync and prune engines
//! - [`config`] - Path and concurrency resolution
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod markdown;
pub mod model;
pub mod piece;
pub mod schema;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
