//! Phase A/B/C of leaving `active`. All three must complete for the
//! transition to count; a partial completion leaves the guard `active`
//! (the caller simply doesn't delete the marker and the next attempt
//! retries from Phase A, since Phase A's appends are themselves
//! idempotent-by-content: re-appending the same heartbeat line twice is
//! harmless noise, not a correctness issue).

use chrono::Utc;
use soul_core::atomic::append;
use soul_core::error::Result;
use soul_core::SoulPath;
use soul_llm::LlmProvider;
use soul_seed::consolidate::{consolidate, ConsolidateMode, ConsolidationInput};
use soul_seed::Seed;
use tokio_util::sync::CancellationToken;

use crate::config::GuardConfig;

/// What Phase A appends. Left to the caller to fill in: the guard protocol
/// doesn't generate this content, it only guarantees it lands before
/// consolidation runs.
#[derive(Debug, Clone, Default)]
pub struct PhaseAInputs {
    pub heartbeat_entry: Option<String>,
    pub evolution_entry: Option<String>,
    pub memory_entry: Option<String>,
    pub knowledge_graph_lines: Vec<String>,
}

/// Phase A: append-only writes that must land before consolidation reads
/// their backing files.
pub fn phase_a(soul: &SoulPath, inputs: &PhaseAInputs) -> Result<()> {
    let today = Utc::now().format("%Y-%m-%d").to_string();

    if let Some(entry) = &inputs.heartbeat_entry {
        let path = soul.heartbeat_dir().join(format!("{today}.md"));
        append(&path, format!("{entry}\n").as_bytes())?;
    }
    if let Some(entry) = &inputs.evolution_entry {
        let path = soul.seele_dir().join("EVOLUTION.md");
        append(&path, format!("{entry}\n").as_bytes())?;
    }
    if let Some(entry) = &inputs.memory_entry {
        let path = soul.memory_dir().join(format!("{today}.md"));
        append(&path, format!("{entry}\n").as_bytes())?;
    }
    for line in &inputs.knowledge_graph_lines {
        append(&soul.knowledge_graph(), format!("{line}\n").as_bytes())?;
    }
    Ok(())
}

/// Phase B: full Seed Engine consolidation. `bump_sessions` should be true
/// for a normal leave-active call (the session that is ending counts) and
/// false for crash recovery of a session that already incremented
/// `#sessions` when it woke.
pub async fn phase_b(
    soul: &SoulPath,
    config: &GuardConfig,
    input: &ConsolidationInput,
    provider: &dyn LlmProvider,
    cancel: Option<CancellationToken>,
    bump_sessions: bool,
) -> Result<Seed> {
    consolidate(
        soul,
        ConsolidateMode::Full,
        input,
        provider,
        cancel,
        config.consolidation_timeout(),
        bump_sessions,
    )
    .await
}

/// Phase C: delete the session marker. Only call this after Phase B
/// returned `Ok` — deleting it earlier would let a crash between B and C
/// look like a session that never happened.
pub fn phase_c(soul: &SoulPath) -> Result<()> {
    soul_fabric::delete_session_marker(soul)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::FallbackProvider;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn phase_a_appends_to_dated_files() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        let inputs = PhaseAInputs {
            heartbeat_entry: Some("session ended calmly".to_string()),
            evolution_entry: Some("learned to trim seeds".to_string()),
            memory_entry: Some("met a new collaborator".to_string()),
            knowledge_graph_lines: vec![
                "{\"type\":\"entity\",\"name\":\"Alex\",\"observations\":[\"likes tea\"]}".to_string(),
            ],
        };
        phase_a(&soul, &inputs).unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let heartbeat = fs::read_to_string(soul.heartbeat_dir().join(format!("{today}.md"))).unwrap();
        assert!(heartbeat.contains("session ended calmly"));
        let kg = fs::read_to_string(soul.knowledge_graph()).unwrap();
        assert!(kg.contains("Alex"));
    }

    #[tokio::test]
    async fn phase_b_then_c_clears_the_marker() {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.seele_dir()).unwrap();
        soul_fabric::create_session_marker(&soul, &soul_fabric::SessionMarker::new(1)).unwrap();

        let config = GuardConfig::default();
        let seed = phase_b(
            &soul,
            &config,
            &ConsolidationInput::default(),
            &FallbackProvider,
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(seed.sessions, 1);
        phase_c(&soul).unwrap();

        assert!(!soul_fabric::session_is_active(&soul));
    }
}
