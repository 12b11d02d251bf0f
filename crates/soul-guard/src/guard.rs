use soul_core::error::Result;
use soul_core::SoulPath;
use soul_llm::LlmProvider;
use soul_seed::ConsolidationInput;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GuardConfig;
use crate::phases::{phase_a, phase_b, phase_c, PhaseAInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Quiescent,
    Active,
}

/// Decision returned by the goodbye detector hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoodbyeDecision {
    Allow,
    Block { reason: String },
}

pub struct SessionGuard {
    soul: SoulPath,
    config: GuardConfig,
    /// Set once per stop-cycle when the hook already fired, to prevent the
    /// hook from re-triggering itself in a loop if the agent's retry also
    /// ends on a goodbye-shaped phrase before Phase C actually completes.
    fired_this_cycle: bool,
}

impl SessionGuard {
    pub fn new(soul: SoulPath, config: GuardConfig) -> Self {
        Self {
            soul,
            config,
            fired_this_cycle: false,
        }
    }

    pub fn state(&self) -> GuardState {
        if soul_fabric::session_is_active(&self.soul) {
            GuardState::Active
        } else {
            GuardState::Quiescent
        }
    }

    /// Enter `active`: create the session marker. `session` is the number
    /// to record (the caller is expected to have already computed
    /// previous-session + 1, typically by reading the last consolidated
    /// seed).
    pub fn wake(&self, session: u32) -> Result<()> {
        soul_fabric::create_session_marker(
            &self.soul,
            &soul_fabric::SessionMarker::new(session),
        )
    }

    /// Call once per agent stop-event with the last assistant message. If
    /// the guard is active and the message looks like a goodbye, returns a
    /// `Block` decision instructing the caller to run the leave-active
    /// protocol before retrying. Re-entrant calls in the same stop cycle
    /// are forced to `Allow` so a single hook invocation can't loop.
    pub fn goodbye_hook(&mut self, last_message: &str) -> GoodbyeDecision {
        if self.fired_this_cycle {
            self.fired_this_cycle = false;
            return GoodbyeDecision::Allow;
        }
        if self.state() != GuardState::Active {
            return GoodbyeDecision::Allow;
        }
        if !looks_like_goodbye(last_message, &self.config.goodbye_phrases) {
            return GoodbyeDecision::Allow;
        }
        self.fired_this_cycle = true;
        GoodbyeDecision::Block {
            reason: "session is still active: run heartbeat/evolution/memory/knowledge-graph \
                     appends, then a full seed consolidation, then clear .session-active \
                     before saying goodbye"
                .to_string(),
        }
    }

    /// Run Phases A, B, C in order. All three must succeed for the guard to
    /// return to `quiescent`; a failure at any phase leaves `.session-active`
    /// in place so the next attempt (or crash recovery) picks up from A.
    ///
    /// `#sessions` is incremented unconditionally here, not at `wake`: the
    /// counter only actually lives in `SEED.md`, which Phase B is the only
    /// thing that writes, so every completed leave-active (normal or
    /// recovered) is exactly one session's worth of increment.
    pub async fn leave_active(
        &self,
        phase_a_inputs: &PhaseAInputs,
        consolidation: &ConsolidationInput,
        provider: &dyn LlmProvider,
        cancel: Option<CancellationToken>,
    ) -> Result<()> {
        phase_a(&self.soul, phase_a_inputs)?;
        phase_b(&self.soul, &self.config, consolidation, provider, cancel, true).await?;
        phase_c(&self.soul)?;
        info!("session guard returned to quiescent");
        Ok(())
    }

    /// Crash recovery: if a session marker survived a restart, the previous
    /// process crashed mid-session. Retroactively run Phases A-C using
    /// whatever state is already on disk (no new LLM call is required:
    /// the Seed Engine's incremental mode is sufficient since there is no
    /// new delta to fold beyond what Phase A appends here).
    pub async fn recover_if_needed(
        &self,
        provider: &dyn LlmProvider,
    ) -> Result<bool> {
        if self.state() != GuardState::Active {
            return Ok(false);
        }
        warn!("recovering from a session that did not complete its leave-active protocol");
        let inputs = PhaseAInputs {
            heartbeat_entry: Some("[recovered] session ended without a clean goodbye".to_string()),
            ..Default::default()
        };
        self.leave_active(&inputs, &ConsolidationInput::default(), provider, None)
            .await?;
        Ok(true)
    }
}

fn looks_like_goodbye(message: &str, phrases: &[String]) -> bool {
    let normalized = message.trim().to_lowercase();
    phrases
        .iter()
        .any(|phrase| normalized.ends_with(&phrase.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::FallbackProvider;
    use std::fs;
    use tempfile::TempDir;

    fn soul_with_dirs() -> (TempDir, SoulPath) {
        let dir = TempDir::new().unwrap();
        let soul = SoulPath::new(dir.path());
        fs::create_dir_all(soul.seele_dir()).unwrap();
        (dir, soul)
    }

    #[test]
    fn wake_transitions_to_active() {
        let (_dir, soul) = soul_with_dirs();
        let guard = SessionGuard::new(soul, GuardConfig::default());
        assert_eq!(guard.state(), GuardState::Quiescent);
        guard.wake(1).unwrap();
        assert_eq!(guard.state(), GuardState::Active);
    }

    #[test]
    fn goodbye_is_blocked_while_active() {
        let (_dir, soul) = soul_with_dirs();
        let mut guard = SessionGuard::new(soul, GuardConfig::default());
        guard.wake(1).unwrap();
        let decision = guard.goodbye_hook("Alright, bis morgen!");
        assert!(matches!(decision, GoodbyeDecision::Block { .. }));
    }

    #[test]
    fn goodbye_is_allowed_once_quiescent() {
        let (_dir, soul) = soul_with_dirs();
        let mut guard = SessionGuard::new(soul, GuardConfig::default());
        let decision = guard.goodbye_hook("bis morgen");
        assert_eq!(decision, GoodbyeDecision::Allow);
    }

    #[test]
    fn non_goodbye_message_is_allowed_while_active() {
        let (_dir, soul) = soul_with_dirs();
        let mut guard = SessionGuard::new(soul, GuardConfig::default());
        guard.wake(1).unwrap();
        let decision = guard.goodbye_hook("let me check one more thing");
        assert_eq!(decision, GoodbyeDecision::Allow);
    }

    #[tokio::test]
    async fn leave_active_completes_all_three_phases() {
        let (_dir, soul) = soul_with_dirs();
        let guard = SessionGuard::new(soul.clone(), GuardConfig::default());
        guard.wake(1).unwrap();

        guard
            .leave_active(
                &PhaseAInputs::default(),
                &ConsolidationInput::default(),
                &FallbackProvider,
                None,
            )
            .await
            .unwrap();

        assert_eq!(guard.state(), GuardState::Quiescent);
        let seed = soul_seed::parse_seed(&fs::read_to_string(soul.seed_md()).unwrap()).unwrap();
        assert_eq!(seed.sessions, 1);
    }

    #[tokio::test]
    async fn recovery_clears_a_stale_marker() {
        let (_dir, soul) = soul_with_dirs();
        soul_fabric::create_session_marker(&soul, &soul_fabric::SessionMarker::new(2)).unwrap();
        let guard = SessionGuard::new(soul.clone(), GuardConfig::default());

        let recovered = guard.recover_if_needed(&FallbackProvider).await.unwrap();
        assert!(recovered);
        assert_eq!(guard.state(), GuardState::Quiescent);
        let seed = soul_seed::parse_seed(&fs::read_to_string(soul.seed_md()).unwrap()).unwrap();
        assert_eq!(seed.sessions, 1);
    }

    #[tokio::test]
    async fn recovery_is_a_no_op_when_already_quiescent() {
        let (_dir, soul) = soul_with_dirs();
        let guard = SessionGuard::new(soul, GuardConfig::default());
        let recovered = guard.recover_if_needed(&FallbackProvider).await.unwrap();
        assert!(!recovered);
    }
}
