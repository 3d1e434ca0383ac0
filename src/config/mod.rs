//! Configuration management.
//!
//! Shelf keeps two locations apart:
//! - **Catalog root**: the directory holding `<kind>/<slug>.md` files and
//!   `assets/`. Usually a git repository the user edits by hand.
//! - **Database**: the SQLite index, by default in `~/.shelf/data/shelf.db`
//!   so the catalog directory stays free of derived files.
//!
//! Each setting resolves from an explicit flag, then an environment
//! variable, then a default.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the database path.
pub const DB_ENV: &str = "SHELF_DB";
/// Environment variable overriding the catalog root.
pub const ROOT_ENV: &str = "SHELF_ROOT";
/// Environment variable overriding sync concurrency.
pub const CONCURRENCY_ENV: &str = "SHELF_CONCURRENCY";

/// Get the global Shelf directory location (`~/.shelf/`).
#[must_use]
pub fn global_shelf_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".shelf"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `SHELF_DB` environment variable
/// 3. Global location: `~/.shelf/data/shelf.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no home directory
/// can be determined.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = non_empty_env(DB_ENV) {
        return Some(PathBuf::from(path));
    }

    global_shelf_dir().map(|dir| dir.join("data").join("shelf.db"))
}

/// Resolve the catalog root.
///
/// Priority: `explicit_root`, then `SHELF_ROOT`, then the current directory.
///
/// # Errors
///
/// Returns `Error::Config` if the resolved path is not a directory.
pub fn resolve_root(explicit_root: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit_root {
        Some(path) => path.to_path_buf(),
        None => match non_empty_env(ROOT_ENV) {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()?,
        },
    };

    if !root.is_dir() {
        return Err(Error::Config(format!(
            "catalog root {} is not a directory",
            root.display()
        )));
    }
    Ok(root)
}

/// Resolve how many files sync reads ahead in parallel.
///
/// Priority: `explicit`, then `SHELF_CONCURRENCY`, then the logical CPU count.
///
/// # Errors
///
/// Returns `Error::Config` if the value is zero or not a number.
pub fn resolve_concurrency(explicit: Option<usize>) -> Result<NonZeroUsize> {
    let raw = match explicit {
        Some(n) => n,
        None => match non_empty_env(CONCURRENCY_ENV) {
            Some(value) => parse_concurrency(&value)?,
            None => return Ok(crate::sync::default_concurrency()),
        },
    };
    NonZeroUsize::new(raw).ok_or_else(|| Error::Config("concurrency must be at least 1".to_string()))
}

fn parse_concurrency(value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("{CONCURRENCY_ENV} must be a positive integer, got '{value}'"))
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/shelf.db");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_default_name() {
        let result = resolve_db_path(None);
        assert!(result.is_some_and(|p| p.extension().is_some_and(|e| e == "db")));
    }

    #[test]
    fn test_resolve_root_explicit() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(temp_dir.path())).unwrap(), temp_dir.path());

        let missing = temp_dir.path().join("missing");
        assert!(matches!(resolve_root(Some(&missing)), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_concurrency_explicit() {
        assert_eq!(resolve_concurrency(Some(3)).unwrap().get(), 3);
        assert!(matches!(resolve_concurrency(Some(0)), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_concurrency() {
        assert_eq!(parse_concurrency(" 8 ").unwrap(), 8);
        assert!(parse_concurrency("many").is_err());
    }
}
