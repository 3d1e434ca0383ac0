//! Catalog file storage.
//!
//! Everything under the catalog root (markdown files and stored assets) is
//! accessed through [`FileStorage`], addressed by `/`-separated paths
//! relative to the root. Writes are atomic: content goes to a temporary
//! sibling, is synced to disk, then renamed over the target.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{Error, Result};

/// Read/write access to files under a catalog root.
pub trait FileStorage: Send + Sync {
    /// Absolute location of a root-relative path.
    fn resolve(&self, rel: &str) -> PathBuf;

    /// Read a file's bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file does not exist.
    fn read(&self, rel: &str) -> Result<Vec<u8>>;

    /// Atomically replace a file's content, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any file operation fails.
    fn write(&self, rel: &str, bytes: &[u8]) -> Result<()>;

    /// Copy an arbitrary local file into the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the target written.
    fn copy(&self, from: &Path, rel: &str) -> Result<()> {
        let bytes = fs::read(from)?;
        self.write(rel, &bytes)
    }

    fn exists(&self, rel: &str) -> bool;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file does not exist.
    fn remove(&self, rel: &str) -> Result<()>;

    /// Modification time in Unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file does not exist.
    fn modified(&self, rel: &str) -> Result<i64>;

    /// Root-relative paths of the `.md` files directly inside `dir`, sorted.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    fn list_markdown(&self, dir: &str) -> Result<Vec<String>>;
}

/// [`FileStorage`] over a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn not_found(rel: &str) -> Error {
        Error::NotFound {
            path: rel.to_string(),
        }
    }
}

impl FileStorage for LocalStorage {
    fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn read(&self, rel: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(rel)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(rel),
            _ => Error::Io(e),
        })
    }

    fn write(&self, rel: &str, bytes: &[u8]) -> Result<()> {
        atomic_write(&self.resolve(rel), bytes)
    }

    fn exists(&self, rel: &str) -> bool {
        self.resolve(rel).is_file()
    }

    fn remove(&self, rel: &str) -> Result<()> {
        fs::remove_file(self.resolve(rel)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(rel),
            _ => Error::Io(e),
        })
    }

    fn modified(&self, rel: &str) -> Result<i64> {
        let meta = fs::metadata(self.resolve(rel)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(rel),
            _ => Error::Io(e),
        })?;
        let since_epoch = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Other(format!("file time before epoch: {e}")))?;
        Ok(i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX))
    }

    fn list_markdown(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.resolve(dir);
        if !path.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if entry.file_type()?.is_file() && name.ends_with(".md") && !name.starts_with('.') {
                files.push(format!("{dir}/{name}"));
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage.write("book/dune.md", b"hello").unwrap();
        assert!(storage.exists("book/dune.md"));
        assert_eq!(storage.read("book/dune.md").unwrap(), b"hello");
        assert!(!temp_dir.path().join("book/dune.md.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        assert!(matches!(storage.read("book/none.md"), Err(Error::NotFound { .. })));
        assert!(matches!(storage.modified("book/none.md"), Err(Error::NotFound { .. })));
        assert!(matches!(storage.remove("book/none.md"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_copy_from_outside_root() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("cover.png");
        std::fs::write(&source, b"png").unwrap();

        let storage = LocalStorage::new(temp_dir.path().join("catalog"));
        storage.copy(&source, "assets/book/cover.png").unwrap();
        assert_eq!(storage.read("assets/book/cover.png").unwrap(), b"png");
        assert!(source.exists());
    }

    #[test]
    fn test_list_markdown_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        storage.write("game/zelda.md", b"").unwrap();
        storage.write("game/celeste.md", b"").unwrap();
        storage.write("game/notes.txt", b"").unwrap();
        storage.write("game/.hidden.md", b"").unwrap();

        assert_eq!(
            storage.list_markdown("game").unwrap(),
            vec!["game/celeste.md", "game/zelda.md"]
        );
        assert!(storage.list_markdown("film").unwrap().is_empty());
    }
}
