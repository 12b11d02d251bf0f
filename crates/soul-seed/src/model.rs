use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Names the engine understands well enough to run a mechanical templater
/// over. Anything else is an "unknown block": preserved verbatim, never
/// regenerated.
pub const KNOWN_BLOCKS: &[&str] = &[
    "META",
    "KERN",
    "SELF",
    "STATE",
    "INTERESTS",
    "DREAMS",
    "BONDS",
    "MEM",
    "SHADOW",
    "CONNECTIONS",
    "GROWTH",
    "OPEN",
    "VORSCHLAG",
];

/// One `@NAME{ ... }` block. `pairs` holds the parsed `key:value` entries in
/// file order; `raw` holds the original inner text so an unrecognized block
/// (or one whose body didn't parse into pairs) can be written back
/// byte-for-byte.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub pairs: IndexMap<String, String>,
    pub raw: String,
}

impl Block {
    pub fn from_pairs(pairs: IndexMap<String, String>) -> Self {
        let raw = render_pairs(&pairs);
        Self { pairs, raw }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(|s| s.as_str())
    }

    /// Render this block's body. Known blocks with parsed pairs re-render
    /// from the pairs (so edits via `setBlock`/templaters take effect);
    /// everything else round-trips the original text verbatim.
    pub fn render(&self) -> String {
        if self.pairs.is_empty() {
            self.raw.clone()
        } else {
            render_pairs(&self.pairs)
        }
    }
}

fn render_pairs(pairs: &IndexMap<String, String>) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("  {k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A parsed seed: header metadata plus an ordered map of blocks (insertion
/// order is file order, so re-serialization is stable).
#[derive(Debug, Clone, Default)]
pub struct Seed {
    pub version: String,
    pub born: Option<String>,
    pub condensed: Option<String>,
    pub sessions: u32,
    pub blocks: IndexMap<String, Block>,
}

impl Seed {
    pub fn get_block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    pub fn set_block(&mut self, name: &str, block: Block) {
        self.blocks.insert(name.to_string(), block);
    }

    /// Serialize back to seed notation. Round-trips byte-for-byte for any
    /// seed that was only parsed and not mutated (Testable Property: parse
    /// round-trip on the AST).
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("#SEED v{}\n", self.version));
        if let Some(born) = &self.born {
            out.push_str(&format!("#born:{born}\n"));
        }
        if let Some(condensed) = &self.condensed {
            out.push_str(&format!("#condensed:{condensed}\n"));
        }
        out.push_str(&format!("#sessions:{}\n", self.sessions));
        out.push('\n');
        for (name, block) in &self.blocks {
            out.push_str(&format!("@{name}{{\n{}\n}}\n", block.render()));
        }
        out
    }

    pub fn byte_len(&self) -> usize {
        self.render().len()
    }
}
