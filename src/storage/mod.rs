//! Storage layer for the catalog.
//!
//! Two kinds of storage sit behind this module:
//! - the catalog directory itself (markdown files and stored assets),
//!   reached through [`FileStorage`]
//! - the SQLite index: the content cache and one item table per content type
//!
//! # Submodules
//!
//! - [`cache`] - Last-synced content hash per file
//! - [`files`] - Catalog file access with atomic writes
//! - [`items`] - Item row access
//! - [`schema`] - Table definitions and bootstrapping
//! - [`sqlite`] - Connection handling and transactions

pub mod cache;
pub mod files;
pub mod items;
pub mod schema;
pub mod sqlite;

pub use cache::CacheEntry;
pub use files::{FileStorage, LocalStorage, atomic_write};
pub use items::{ItemFilter, ItemRow, ItemValues};
pub use schema::{ColumnDef, ensure_item_table};
pub use sqlite::{SqliteStorage, with_transaction};
