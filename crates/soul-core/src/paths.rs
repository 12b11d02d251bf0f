//! Canonical layout of a soul directory, per the data model.

use std::path::{Path, PathBuf};

/// Handle onto one soul directory. Cheap to clone; every accessor just joins
/// a relative path, it does not touch the filesystem.
#[derive(Debug, Clone)]
pub struct SoulPath {
    root: PathBuf,
}

impl SoulPath {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve from the `SOUL_PATH` environment variable, falling back to
    /// the current directory's parent.
    pub fn from_env() -> std::io::Result<Self> {
        if let Ok(p) = std::env::var("SOUL_PATH") {
            return Ok(Self::new(expand_tilde(&p)));
        }
        let cwd = std::env::current_dir()?;
        let parent = cwd.parent().map(Path::to_path_buf).unwrap_or(cwd);
        Ok(Self::new(parent))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn seed_md(&self) -> PathBuf {
        self.root.join("SEED.md")
    }

    pub fn soul_md(&self) -> PathBuf {
        self.root.join("SOUL.md")
    }

    pub fn seele_dir(&self) -> PathBuf {
        self.root.join("seele")
    }

    /// `seele/KERN.md`, or its English synonym `soul/CORE.md` if that's the
    /// one actually on disk. Both name the same immutable-axioms file; a
    /// soul uses one or the other, never both.
    pub fn kern_md(&self) -> PathBuf {
        let english = self.root.join("soul").join("CORE.md");
        if english.exists() {
            return english;
        }
        self.seele_dir().join("KERN.md")
    }

    pub fn beziehungen_dir(&self) -> PathBuf {
        self.seele_dir().join("beziehungen")
    }

    pub fn erinnerungen_dir(&self) -> PathBuf {
        self.root.join("erinnerungen")
    }

    pub fn heartbeat_dir(&self) -> PathBuf {
        self.root.join("heartbeat")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("memory")
    }

    /// `zustandslog/`, or its English synonym `statelog/` if that's the one
    /// actually on disk.
    pub fn zustandslog_dir(&self) -> PathBuf {
        let english = self.root.join("statelog");
        if english.exists() {
            return english;
        }
        self.root.join("zustandslog")
    }

    pub fn knowledge_graph(&self) -> PathBuf {
        self.root.join("knowledge-graph.jsonl")
    }

    pub fn pulse_file(&self) -> PathBuf {
        self.root.join(".soul-pulse")
    }

    pub fn mood_file(&self) -> PathBuf {
        self.root.join(".soul-mood")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.root.join(".soul-events")
    }

    pub fn events_current(&self) -> PathBuf {
        self.events_dir().join("current.jsonl")
    }

    pub fn session_active(&self) -> PathBuf {
        self.root.join(".session-active")
    }

    pub fn chain_status(&self) -> PathBuf {
        self.root.join(".soul-chain-status")
    }

    pub fn chain_config(&self) -> PathBuf {
        self.root.join(".soul-chain")
    }
}

/// `~/foo` -> `$HOME/foo`. Paths not starting with `~` are returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_are_relative_to_root() {
        let sp = SoulPath::new("/tmp/soul");
        assert_eq!(sp.seed_md(), PathBuf::from("/tmp/soul/SEED.md"));
        assert_eq!(sp.kern_md(), PathBuf::from("/tmp/soul/seele/KERN.md"));
        assert_eq!(
            sp.events_current(),
            PathBuf::from("/tmp/soul/.soul-events/current.jsonl")
        );
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn kern_md_prefers_german_name_when_neither_exists() {
        let sp = SoulPath::new("/tmp/soul");
        assert_eq!(sp.kern_md(), PathBuf::from("/tmp/soul/seele/KERN.md"));
    }

    #[test]
    fn kern_md_resolves_to_english_synonym_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let sp = SoulPath::new(dir.path());
        std::fs::create_dir_all(dir.path().join("soul")).unwrap();
        std::fs::write(dir.path().join("soul").join("CORE.md"), "axioms").unwrap();
        assert_eq!(sp.kern_md(), dir.path().join("soul").join("CORE.md"));
    }

    #[test]
    fn zustandslog_dir_resolves_to_english_synonym_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let sp = SoulPath::new(dir.path());
        std::fs::create_dir_all(dir.path().join("statelog")).unwrap();
        assert_eq!(sp.zustandslog_dir(), dir.path().join("statelog"));
    }
}
