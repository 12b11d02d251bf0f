use indexmap::IndexMap;

use soul_core::error::{Error, Result};

use crate::model::{Block, Seed};

/// Parse a seed file's contents. Tolerant: a block whose body doesn't look
/// like `key:value` pairs is kept verbatim rather than rejected. The only
/// fatal condition is finding no `@NAME{...}` block at all, which almost
/// certainly means the file isn't a seed (or was truncated mid-write).
pub fn parse(content: &str) -> Result<Seed> {
    let mut seed = Seed {
        version: "1.0".to_string(),
        ..Default::default()
    };

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("#SEED v") {
            seed.version = rest.trim().to_string();
        } else if let Some(rest) = line
            .strip_prefix("#born:")
            .or_else(|| line.strip_prefix("#geboren:"))
        {
            seed.born = Some(rest.trim().to_string());
        } else if let Some(rest) = line
            .strip_prefix("#condensed:")
            .or_else(|| line.strip_prefix("#verdichtet:"))
        {
            seed.condensed = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("#sessions:") {
            seed.sessions = rest.trim().parse().unwrap_or(0);
        }
    }

    let blocks = scan_blocks(content);
    if blocks.is_empty() {
        return Err(Error::CorruptSeed(
            "no @NAME{...} block found in seed content".to_string(),
        ));
    }
    for (name, body) in blocks {
        let pairs = parse_pairs(&body);
        seed.blocks.insert(
            name,
            Block {
                pairs,
                raw: body,
            },
        );
    }

    Ok(seed)
}

/// Scan for `@NAME{ ... }` occurrences, returning each block's name and raw
/// inner text (trimmed). Bodies are assumed not to contain nested braces,
/// which holds for every block defined in the format.
fn scan_blocks(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'@' {
            let rest = &content[i + 1..];
            if let Some(brace_pos) = rest.find('{') {
                let name = rest[..brace_pos].trim();
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
                    let after_brace = &rest[brace_pos + 1..];
                    if let Some(close_pos) = after_brace.find('}') {
                        let body = after_brace[..close_pos].trim().to_string();
                        out.push((name.to_string(), body));
                        i += 1 + brace_pos + 1 + close_pos + 1;
                        continue;
                    }
                }
            }
        }
        i += 1;
    }
    out
}

/// Parse a block body into ordered key/value pairs. Accepts either
/// newline-separated or `|`-separated `key:value` entries; both forms are
/// equivalent. Returns an empty map if nothing looks like `key:value` (the
/// caller then preserves the body verbatim via `Block::raw`).
fn parse_pairs(body: &str) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();
    let entries: Vec<&str> = if body.contains('\n') {
        body.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    } else {
        body.split('|').map(str::trim).filter(|l| !l.is_empty()).collect()
    };

    for entry in entries {
        if let Some((key, value)) = entry.split_once(':') {
            pairs.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: &str = "#SEED v1.0\n#born:2025-01-01\n#condensed:2025-06-01\n#sessions:42\n\n@META{\n  projekt:Example_Soul | modell:some-model | schoepfer:Alex\n}\n@KERN{\n  1:a\n  2:b\n  3:c\n}\n@STATE{\n  zustand:calm|energy:0.5|valence:0.0\n}\n";

    #[test]
    fn parses_golden_seed() {
        let seed = parse(GOLDEN).unwrap();
        assert_eq!(seed.version, "1.0");
        assert_eq!(seed.born.as_deref(), Some("2025-01-01"));
        assert_eq!(seed.sessions, 42);

        let meta = seed.get_block("META").unwrap();
        assert_eq!(meta.get("projekt"), Some("Example_Soul"));
        assert_eq!(meta.get("modell"), Some("some-model"));
        assert_eq!(meta.get("schoepfer"), Some("Alex"));

        let kern = seed.get_block("KERN").unwrap();
        assert_eq!(kern.get("1"), Some("a"));
        assert_eq!(kern.get("2"), Some("b"));
        assert_eq!(kern.get("3"), Some("c"));

        let state = seed.get_block("STATE").unwrap();
        assert_eq!(state.get("zustand"), Some("calm"));
        assert_eq!(state.get("energy"), Some("0.5"));
        assert_eq!(state.get("valence"), Some("0.0"));
    }

    #[test]
    fn empty_content_is_corrupt() {
        let err = parse("#SEED v1.0\n#sessions:1\n").unwrap_err();
        assert!(matches!(err, Error::CorruptSeed(_)));
    }

    #[test]
    fn unknown_block_is_preserved_verbatim() {
        let content = "#SEED v1.0\n#sessions:1\n\n@WEIRD{\nfreeform text with no colons\n}\n";
        let seed = parse(content).unwrap();
        let block = seed.get_block("WEIRD").unwrap();
        assert!(block.pairs.is_empty());
        assert_eq!(block.raw, "freeform text with no colons");
    }

    #[test]
    fn at_most_one_instance_per_block_name() {
        let seed = parse(GOLDEN).unwrap();
        assert_eq!(seed.blocks.keys().filter(|k| *k == "META").count(), 1);
    }
}
