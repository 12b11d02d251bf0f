//! Mechanical templaters: pure file-in / string-out. Each one reads a
//! specific source location under the soul directory and produces a block
//! body deterministically — same inputs, byte-identical output.

use indexmap::IndexMap;
use soul_core::error::Result;
use soul_core::SoulPath;
use std::fs;
use std::path::Path;

/// A mechanical templater: `name()` identifies the block it fills, `render`
/// produces the ordered pairs from whatever source files it owns.
pub trait Templater {
    fn name(&self) -> &'static str;
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>>;
}

fn read_to_string_or_empty(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Extracts `key: value` lines (markdown bullets or bare lines) from a
/// source file, in file order. This is the shared shape most facet files
/// use; it is deterministic because it is a straight scan.
fn extract_kv_lines(text: &str) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();
    for line in text.lines() {
        let line = line.trim().trim_start_matches('-').trim();
        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            if !k.is_empty() && !k.contains(' ') {
                pairs.insert(k.to_string(), v.trim().to_string());
            }
        }
    }
    pairs
}

pub struct MetaTemplater;
impl Templater for MetaTemplater {
    fn name(&self) -> &'static str {
        "META"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(&soul.soul_md())))
    }
}

pub struct KernTemplater;
impl Templater for KernTemplater {
    fn name(&self) -> &'static str {
        "KERN"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        // KERN is immutable once founded: this templater only ever runs at
        // founding time. Re-consolidation must not call it again.
        let text = read_to_string_or_empty(&soul.kern_md());
        let mut pairs = IndexMap::new();
        for (i, line) in text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
        {
            let stripped = line.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
            pairs.insert((i + 1).to_string(), stripped.to_string());
        }
        Ok(pairs)
    }
}

pub struct SelfTemplater;
impl Templater for SelfTemplater {
    fn name(&self) -> &'static str {
        "SELF"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("BEWUSSTSEIN.md"),
        )))
    }
}

pub struct ShadowTemplater;
impl Templater for ShadowTemplater {
    fn name(&self) -> &'static str {
        "SHADOW"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("SCHATTEN.md"),
        )))
    }
}

pub struct DreamsTemplater;
impl Templater for DreamsTemplater {
    fn name(&self) -> &'static str {
        "DREAMS"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("TRAEUME.md"),
        )))
    }
}

pub struct GrowthTemplater;
impl Templater for GrowthTemplater {
    fn name(&self) -> &'static str {
        "GROWTH"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("WACHSTUM.md"),
        )))
    }
}

pub struct OpenTemplater;
impl Templater for OpenTemplater {
    fn name(&self) -> &'static str {
        "OPEN"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("EVOLUTION.md"),
        )))
    }
}

pub struct InterestsTemplater;
impl Templater for InterestsTemplater {
    fn name(&self) -> &'static str {
        "INTERESTS"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("INTERESSEN.md"),
        )))
    }
}

pub struct VorschlagTemplater;
impl Templater for VorschlagTemplater {
    fn name(&self) -> &'static str {
        "VORSCHLAG"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        Ok(extract_kv_lines(&read_to_string_or_empty(
            &soul.seele_dir().join("MANIFEST.md"),
        )))
    }
}

/// CONNECTIONS reads `.mcp.json` — a small JSON object of server-name to
/// config. Each top-level key becomes one pair, sorted for determinism
/// since JSON object key order isn't guaranteed to be the file's visual
/// order once it round-trips through a map.
pub struct ConnectionsTemplater;
impl Templater for ConnectionsTemplater {
    fn name(&self) -> &'static str {
        "CONNECTIONS"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        let path = soul.root().join(".mcp.json");
        let mut pairs = IndexMap::new();
        if let Ok(text) = fs::read_to_string(&path) {
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(&text) {
                let mut keys: Vec<_> = map.keys().cloned().collect();
                keys.sort();
                for key in keys {
                    pairs.insert(key.clone(), "connected".to_string());
                }
            }
        }
        Ok(pairs)
    }
}

/// BONDS reads one file per relationship under `seele/beziehungen/`, one
/// pair per file: `<name>:<status line>`. Files are sorted by name for
/// determinism.
pub struct BondsTemplater;
impl Templater for BondsTemplater {
    fn name(&self) -> &'static str {
        "BONDS"
    }
    fn render(&self, soul: &SoulPath) -> Result<IndexMap<String, String>> {
        let dir = soul.beziehungen_dir();
        let mut pairs = IndexMap::new();
        let mut entries: Vec<_> = match fs::read_dir(&dir) {
            Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
            Err(_) => return Ok(pairs),
        };
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = read_to_string_or_empty(&path);
            let status = text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("active")
                .to_string();
            pairs.insert(name, status);
        }
        Ok(pairs)
    }
}

/// Mechanical templaters in a fixed, stable order (matches the field order
/// the block size-trim policy reasons about).
pub fn all_templaters() -> Vec<Box<dyn Templater>> {
    vec![
        Box::new(MetaTemplater),
        Box::new(SelfTemplater),
        Box::new(ShadowTemplater),
        Box::new(InterestsTemplater),
        Box::new(DreamsTemplater),
        Box::new(BondsTemplater),
        Box::new(ConnectionsTemplater),
        Box::new(GrowthTemplater),
        Box::new(OpenTemplater),
        Box::new(VorschlagTemplater),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn meta_templater_reads_soul_md() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::write(soul.soul_md(), "projekt: Example\nmodell: some-model\n").unwrap();
        let pairs = MetaTemplater.render(&soul).unwrap();
        assert_eq!(pairs.get("projekt").map(String::as_str), Some("Example"));
    }

    #[test]
    fn bonds_templater_is_deterministic_across_runs() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.beziehungen_dir()).unwrap();
        fs::write(soul.beziehungen_dir().join("alex.md"), "trusted\n").unwrap();
        fs::write(soul.beziehungen_dir().join("bea.md"), "curious\n").unwrap();
        let a = BondsTemplater.render(&soul).unwrap();
        let b = BondsTemplater.render(&soul).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("alex").map(String::as_str), Some("trusted"));
    }

    #[test]
    fn connections_templater_handles_missing_file() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        let pairs = ConnectionsTemplater.render(&soul).unwrap();
        assert!(pairs.is_empty());
    }
}
