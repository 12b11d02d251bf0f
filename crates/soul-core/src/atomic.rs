//! Atomic file replace: write to a temp sibling, fsync, rename over the target.
//!
//! Every writer in the workspace that owns a file (Seed, fabric channels,
//! chain status) goes through this so readers never observe a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use rand::Rng;

use crate::error::{Error, Result};

/// Write `contents` to `path` atomically. Creates the parent directory if
/// missing.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::transient(parent, e))?;
    }
    let tmp_path = tmp_sibling(path);
    let mut file = File::create(&tmp_path).map_err(|e| Error::transient(&tmp_path, e))?;
    file.write_all(contents)
        .map_err(|e| Error::transient(&tmp_path, e))?;
    file.sync_all().map_err(|e| Error::transient(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::transient(path, e))?;
    Ok(())
}

/// Append `contents` to `path`, creating it if necessary. Appends are not
/// made atomic by this helper (the append-only files are single-writer by
/// contract, see `soul-core`'s docs on `knowledge-graph.jsonl`), but still
/// flush before returning so a crash immediately after does not lose bytes
/// already accepted by the OS.
pub fn append(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::transient(parent, e))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::transient(path, e))?;
    file.write_all(contents)
        .map_err(|e| Error::transient(path, e))?;
    file.sync_all().map_err(|e| Error::transient(path, e))?;
    Ok(())
}

/// `<path>.tmp-<pid>-<rand>`, unique enough to never collide between two
/// writers of the same file.
fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let pid = std::process::id();
    let rand_suffix: u32 = rand::thread_rng().gen();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp-{pid}-{rand_suffix:08x}"))
}

/// True if `path`'s file name looks like a stray atomic-write temp file that
/// readers scanning a directory should ignore.
pub fn is_tmp_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.contains(".tmp-"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_file_and_no_tmp_remains() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed").join("SEED.md");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_tmp_artifact(&e.path()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_atomic_overwrites_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.md");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn append_accumulates_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.jsonl");
        append(&path, b"{\"a\":1}\n").unwrap();
        append(&path, b"{\"a\":2}\n").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn is_tmp_artifact_recognizes_pattern() {
        assert!(is_tmp_artifact(Path::new("/x/.SEED.md.tmp-123-abc")));
        assert!(!is_tmp_artifact(Path::new("/x/SEED.md")));
    }
}
