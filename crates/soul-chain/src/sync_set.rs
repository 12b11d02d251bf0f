//! Which paths under a soul directory are in scope for peer sync.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

const SYNC_DIRS: &[&str] = &[
    "seele",
    "soul",
    "erinnerungen",
    "memories",
    "heartbeat",
    "memory",
    "zustandslog",
    "statelog",
    "conversations",
];

const SYNC_FILES: &[&str] = &[
    "SEED.md",
    "SOUL.md",
    ".language",
    ".soul-impulse-state",
    ".soul-impulse-log",
    ".soul-state-tick",
    "knowledge-graph.jsonl",
];

/// Names whose filename match puts a record into the additive-union merge
/// policy rather than last-writer-wins.
pub const MERGE_SET: &[&str] = &["knowledge-graph.jsonl"];

fn ignore_globs() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in [".env", ".env.enc", ".mcp.json", ".git", ".git/**", ".claude", ".claude/**"] {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

/// Is `relative_path` (relative to the soul root) excluded from sync?
pub fn is_ignored(relative_path: &Path) -> bool {
    let ignore = ignore_globs();
    if ignore.is_match(relative_path) {
        return true;
    }
    relative_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && !SYNC_FILES.contains(&n))
        .unwrap_or(false)
}

pub fn is_merge_set(relative_path: &Path) -> bool {
    relative_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| MERGE_SET.contains(&n))
        .unwrap_or(false)
}

/// Walk the soul root and return every path in the sync set, relative to
/// the root.
pub fn tracked_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for file in SYNC_FILES {
        let abs = root.join(file);
        if abs.is_file() {
            paths.push(PathBuf::from(file));
        }
    }

    for dir in SYNC_DIRS {
        let abs_dir = root.join(dir);
        if !abs_dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&abs_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(root) {
                Ok(r) => r.to_path_buf(),
                Err(_) => continue,
            };
            if is_ignored(&relative) {
                continue;
            }
            paths.push(relative);
        }
    }

    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn tracks_sync_files_and_dirs_but_not_ignored_ones() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("SEED.md"), "seed").unwrap();
        fs::write(dir.path().join(".env"), "secret=1").unwrap();
        fs::create_dir_all(dir.path().join("seele")).unwrap();
        fs::write(dir.path().join("seele/KERN.md"), "kern").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();

        let tracked = tracked_paths(dir.path());
        assert!(tracked.contains(&PathBuf::from("SEED.md")));
        assert!(tracked.contains(&PathBuf::from("seele/KERN.md")));
        assert!(!tracked.iter().any(|p| p.to_string_lossy().contains(".env")));
        assert!(!tracked.iter().any(|p| p.to_string_lossy().contains(".git")));
    }

    #[test]
    fn knowledge_graph_is_in_the_merge_set() {
        assert!(is_merge_set(Path::new("knowledge-graph.jsonl")));
        assert!(!is_merge_set(Path::new("SEED.md")));
    }
}
