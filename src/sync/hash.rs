//! Content hashing for change detection.
//!
//! A file's SHA256 digest is the only signal sync trusts for "has this file
//! changed since the last sync". Modification times are not compared: they
//! change on copy/checkout without the content changing, and vice versa.

use sha2::{Digest, Sha256};

/// Compute the hex SHA256 of a byte slice.
///
/// Used both for markdown files (change detection) and for asset content
/// (deterministic storage names).
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the hex SHA256 of everything `reader` yields, without buffering it.
///
/// # Errors
///
/// Returns the reader's I/O error.
pub fn reader_hash(mut reader: impl std::io::Read) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check if a file has changed since it was last synced.
///
/// Returns `true` if:
/// - There is no stored hash (never synced, or the cache was dropped)
/// - The current hash differs from the stored hash
#[must_use]
pub fn has_changed(current_hash: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_none_or(|h| h != current_hash)
}
