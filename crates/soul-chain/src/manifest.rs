use std::path::Path;

use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use soul_core::error::Result;

use crate::sync_set::tracked_paths;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub hash: String,
    pub mtime: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Manifest {
    pub files: Vec<FileEntry>,
}

impl Manifest {
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// 16 hex chars of a SHA-256 digest — short enough for a manifest line,
/// long enough that collisions are not a practical concern for this
/// purpose (detecting "did this file change", not a security boundary).
pub fn short_hash(content: &[u8]) -> String {
    let full = digest(&SHA256, content);
    let hex: String = full.as_ref().iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Build the local manifest by hashing every tracked file.
pub fn build_manifest(root: &Path) -> Result<Manifest> {
    let mut files = Vec::new();
    for relative in tracked_paths(root) {
        let abs = root.join(&relative);
        let content = std::fs::read(&abs)?;
        let meta = std::fs::metadata(&abs)?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        files.push(FileEntry {
            path: relative.to_string_lossy().replace('\\', "/"),
            hash: short_hash(&content),
            mtime,
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(Manifest { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn identical_content_hashes_the_same() {
        assert_eq!(short_hash(b"hello"), short_hash(b"hello"));
        assert_ne!(short_hash(b"hello"), short_hash(b"world"));
    }

    #[test]
    fn builds_manifest_from_tracked_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("SEED.md"), "seed content").unwrap();
        let manifest = build_manifest(dir.path()).unwrap();
        let entry = manifest.get("SEED.md").unwrap();
        assert_eq!(entry.hash, short_hash(b"seed content"));
    }

    #[test]
    fn hash_length_is_sixteen_hex_chars() {
        assert_eq!(short_hash(b"x").len(), 16);
    }
}
