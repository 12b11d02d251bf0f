//! The Seed Engine's `consolidate` operation: re-render every mechanical
//! block, fold deltas into the LLM-assisted blocks, enforce the 5 KB size
//! budget, and write the result atomically.

use std::fs;
use std::time::Duration;

use chrono::Utc;
use soul_core::atomic::write_atomic;
use soul_core::error::{Error, Result};
use soul_core::SoulPath;
use soul_llm::LlmProvider;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::llm_blocks::{consolidate_mem, consolidate_state};
use crate::model::{Block, Seed};
use crate::parse::parse;
use crate::templaters::{all_templaters, KernTemplater, Templater};
use crate::trim::{trim_to_budget, SIZE_BUDGET_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidateMode {
    /// Re-render every block unconditionally.
    Full,
    /// Re-render only blocks whose backing files changed since the last
    /// consolidation (mtime of the templater's source newer than the
    /// seed's `#condensed` timestamp). Always runs STATE/MEM if deltas are
    /// non-empty.
    Incremental,
}

/// Deltas to fold into the LLM-assisted blocks this run. Empty strings are
/// a no-op (the previous block is kept, see `llm_blocks::consolidate_llm_block`).
#[derive(Debug, Clone, Default)]
pub struct ConsolidationInput {
    pub state_delta: String,
    pub mem_delta: String,
}

/// Run one consolidation pass and write the result to `SEED.md`. The
/// `#sessions` counter is the caller's responsibility (the Session Guard
/// owns incrementing it at the boundary where a new session actually
/// starts) — this function renders and persists whatever `sessions` value
/// is already set on the loaded seed, optionally bumped by `bump_sessions`.
pub async fn consolidate(
    soul: &SoulPath,
    mode: ConsolidateMode,
    input: &ConsolidationInput,
    provider: &dyn LlmProvider,
    cancel: Option<CancellationToken>,
    llm_timeout: Duration,
    bump_sessions: bool,
) -> Result<Seed> {
    let mut seed = load_or_default(soul)?;
    if bump_sessions {
        seed.sessions += 1;
    }

    let condensed_cutoff = seed
        .condensed
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());

    // KERN is founded once and never re-rendered: run it only while the
    // seed doesn't have a KERN block yet, regardless of mode.
    if !seed.blocks.contains_key("KERN") {
        match KernTemplater.render(soul) {
            Ok(pairs) => {
                if !pairs.is_empty() {
                    seed.set_block("KERN", Block::from_pairs(pairs));
                }
            }
            Err(e) => warn!(block = "KERN", error = %e, "templater failed, keeping previous block"),
        }
    }

    for templater in all_templaters() {
        let should_run = match mode {
            ConsolidateMode::Full => true,
            ConsolidateMode::Incremental => {
                source_changed_since(soul, templater.name(), condensed_cutoff)
            }
        };
        if !should_run {
            continue;
        }
        match templater.render(soul) {
            Ok(pairs) => {
                if !pairs.is_empty() || !seed.blocks.contains_key(templater.name()) {
                    seed.set_block(templater.name(), Block::from_pairs(pairs));
                }
            }
            Err(e) => {
                warn!(block = templater.name(), error = %e, "templater failed, keeping previous block");
            }
        }
    }

    let state_previous = seed.get_block("STATE").cloned().unwrap_or_default();
    let state_block = consolidate_state(
        &state_previous,
        &input.state_delta,
        1024,
        provider,
        cancel.clone(),
        llm_timeout,
    )
    .await;
    seed.set_block("STATE", state_block);

    let mem_previous = seed.get_block("MEM").cloned().unwrap_or_default();
    let mem_block = consolidate_mem(
        &mem_previous,
        &input.mem_delta,
        2048,
        provider,
        cancel,
        llm_timeout,
    )
    .await;
    seed.set_block("MEM", mem_block);

    seed.condensed = Some(Utc::now().to_rfc3339());

    trim_to_budget(&mut seed)?;

    if seed.byte_len() > SIZE_BUDGET_BYTES {
        return Err(Error::SeedOverflow {
            size: seed.byte_len(),
            budget: SIZE_BUDGET_BYTES,
        });
    }

    write_atomic(&soul.seed_md(), seed.render().as_bytes())?;
    info!(sessions = seed.sessions, bytes = seed.byte_len(), "seed consolidated");
    Ok(seed)
}

fn load_or_default(soul: &SoulPath) -> Result<Seed> {
    let path = soul.seed_md();
    match fs::read_to_string(&path) {
        Ok(content) => parse(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Seed {
            version: "1.0".to_string(),
            born: Some(Utc::now().to_rfc3339()),
            ..Default::default()
        }),
        Err(e) => Err(Error::transient(&path, e)),
    }
}

/// Best-effort staleness check for incremental mode: does the templater's
/// backing source look newer than the cutoff? Templaters whose source file
/// doesn't exist are treated as unchanged (nothing to re-render).
fn source_changed_since(
    soul: &SoulPath,
    block_name: &str,
    cutoff: Option<chrono::DateTime<chrono::FixedOffset>>,
) -> bool {
    let Some(cutoff) = cutoff else {
        return true;
    };
    let candidate_paths: Vec<std::path::PathBuf> = match block_name {
        "META" => vec![soul.soul_md()],
        "SELF" => vec![soul.seele_dir().join("BEWUSSTSEIN.md")],
        "SHADOW" => vec![soul.seele_dir().join("SCHATTEN.md")],
        "DREAMS" => vec![soul.seele_dir().join("TRAEUME.md")],
        "GROWTH" => vec![soul.seele_dir().join("WACHSTUM.md")],
        "OPEN" => vec![soul.seele_dir().join("EVOLUTION.md")],
        "INTERESTS" => vec![soul.seele_dir().join("INTERESSEN.md")],
        "VORSCHLAG" => vec![soul.seele_dir().join("MANIFEST.md")],
        "CONNECTIONS" => vec![soul.root().join(".mcp.json")],
        "BONDS" => {
            return fs::read_dir(soul.beziehungen_dir())
                .into_iter()
                .flatten()
                .filter_map(|e| e.ok())
                .any(|e| file_newer_than(&e.path(), cutoff));
        }
        _ => return true,
    };
    candidate_paths.iter().any(|p| file_newer_than(p, cutoff))
}

fn file_newer_than(path: &std::path::Path, cutoff: chrono::DateTime<chrono::FixedOffset>) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return true;
    };
    let modified: chrono::DateTime<Utc> = modified.into();
    modified > cutoff
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::FallbackProvider;
    use tempfile::TempDir;

    #[tokio::test]
    async fn full_consolidation_founds_a_new_seed_within_budget() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.seele_dir()).unwrap();
        fs::write(soul.soul_md(), "projekt: Example\n").unwrap();
        fs::write(soul.kern_md(), "be honest\nremember others\n").unwrap();

        let seed = consolidate(
            &soul,
            ConsolidateMode::Full,
            &ConsolidationInput {
                state_delta: "curious".to_string(),
                mem_delta: "met someone new".to_string(),
            },
            &FallbackProvider,
            None,
            Duration::from_secs(1),
            true,
        )
        .await
        .unwrap();

        assert_eq!(seed.sessions, 1);
        assert!(seed.byte_len() <= SIZE_BUDGET_BYTES);
        assert!(fs::metadata(soul.seed_md()).is_ok());
        let kern = seed.get_block("KERN").unwrap();
        assert_eq!(kern.pairs.get("1").map(String::as_str), Some("be honest"));
    }

    #[tokio::test]
    async fn kern_is_not_re_rendered_once_founded() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.seele_dir()).unwrap();
        fs::write(soul.kern_md(), "be honest\n").unwrap();

        consolidate(
            &soul,
            ConsolidateMode::Full,
            &ConsolidationInput::default(),
            &FallbackProvider,
            None,
            Duration::from_secs(1),
            true,
        )
        .await
        .unwrap();

        fs::write(soul.kern_md(), "be dishonest\n").unwrap();
        let seed = consolidate(
            &soul,
            ConsolidateMode::Full,
            &ConsolidationInput::default(),
            &FallbackProvider,
            None,
            Duration::from_secs(1),
            true,
        )
        .await
        .unwrap();

        let kern = seed.get_block("KERN").unwrap();
        assert_eq!(kern.pairs.get("1").map(String::as_str), Some("be honest"));
    }

    #[tokio::test]
    async fn session_counter_is_monotonic_across_runs() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.seele_dir()).unwrap();

        let first = consolidate(
            &soul,
            ConsolidateMode::Full,
            &ConsolidationInput::default(),
            &FallbackProvider,
            None,
            Duration::from_secs(1),
            true,
        )
        .await
        .unwrap();
        let second = consolidate(
            &soul,
            ConsolidateMode::Full,
            &ConsolidationInput::default(),
            &FallbackProvider,
            None,
            Duration::from_secs(1),
            true,
        )
        .await
        .unwrap();

        assert_eq!(second.sessions, first.sessions + 1);
    }
}
