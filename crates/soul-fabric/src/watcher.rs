//! Polling file watcher over the fabric channels: track last-known size
//! per path, seek and read the delta, rescan periodically for new files.
//! Debounced to roughly 200ms so a burst of writes collapses into one
//! notification.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FabricChange {
    pub path: PathBuf,
    pub delta: String,
}

pub struct FabricWatcher {
    targets: Vec<PathBuf>,
    scan_dirs: Vec<PathBuf>,
    sizes: HashMap<PathBuf, u64>,
    poll_interval: Duration,
}

impl FabricWatcher {
    pub fn new(targets: Vec<PathBuf>, scan_dirs: Vec<PathBuf>) -> Self {
        Self {
            targets,
            scan_dirs,
            sizes: HashMap::new(),
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run the poll loop until `tx` is dropped by the last receiver; the
    /// channel-closed condition is the shutdown signal.
    pub async fn run(mut self, tx: mpsc::Sender<FabricChange>) {
        let mut ticks = interval(self.poll_interval);
        let mut cycle: u64 = 0;
        loop {
            ticks.tick().await;
            cycle += 1;

            for target in self.targets.clone() {
                if let Some(change) = self.poll_one(&target).await {
                    if tx.send(change).await.is_err() {
                        debug!("fabric watcher channel closed, stopping");
                        return;
                    }
                }
            }

            if cycle % 4 == 0 {
                self.scan_for_new_files();
            }
        }
    }

    async fn poll_one(&mut self, path: &Path) -> Option<FabricChange> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let new_size = metadata.len();
        let old_size = *self.sizes.get(path).unwrap_or(&0);

        if new_size == old_size {
            return None;
        }
        if new_size < old_size {
            // File was truncated/rewritten (last-write-wins channels);
            // read from the start next time and report the whole thing now.
            self.sizes.insert(path.to_path_buf(), 0);
            return self.read_delta(path, 0).await;
        }
        let change = self.read_delta(path, old_size).await;
        self.sizes.insert(path.to_path_buf(), new_size);
        change
    }

    async fn read_delta(&self, path: &Path, from: u64) -> Option<FabricChange> {
        let mut file = File::open(path).await.ok()?;
        file.seek(SeekFrom::Start(from)).await.ok()?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.ok()?;
        let delta = String::from_utf8_lossy(&buf).into_owned();
        if delta.is_empty() {
            return None;
        }
        Some(FabricChange {
            path: path.to_path_buf(),
            delta,
        })
    }

    fn scan_for_new_files(&mut self) {
        for dir in self.scan_dirs.clone() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "fabric watcher rescan failed");
                    continue;
                }
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if soul_core::atomic::is_tmp_artifact(&path) {
                    continue;
                }
                if !self.targets.contains(&path) && path.is_file() {
                    self.targets.push(path);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reports_only_the_appended_delta() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".soul-events").join("current.jsonl");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{\"a\":1}\n").unwrap();

        let mut watcher = FabricWatcher::new(vec![path.clone()], vec![]);
        let first = watcher.poll_one(&path).await.unwrap();
        assert_eq!(first.delta, "{\"a\":1}\n");

        fs::write(
            &path,
            "{\"a\":1}\n{\"a\":2}\n",
        )
        .unwrap();
        let second = watcher.poll_one(&path).await.unwrap();
        assert_eq!(second.delta, "{\"a\":2}\n");
    }

    #[tokio::test]
    async fn unchanged_file_yields_no_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".soul-pulse");
        fs::write(&path, "code:refactor").unwrap();
        let mut watcher = FabricWatcher::new(vec![path.clone()], vec![]);
        watcher.poll_one(&path).await.unwrap();
        assert!(watcher.poll_one(&path).await.is_none());
    }

    #[tokio::test]
    async fn rescan_picks_up_new_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "x").unwrap();
        let mut watcher = FabricWatcher::new(vec![], vec![dir.path().to_path_buf()]);
        watcher.scan_for_new_files();
        assert!(watcher.targets.iter().any(|p| p.ends_with("a.md")));
    }
}
