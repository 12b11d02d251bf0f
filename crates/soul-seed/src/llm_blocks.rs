//! LLM-assisted blocks: STATE and MEM. Unlike the mechanical templaters,
//! these compress freeform deltas into natural-language summaries via a
//! provider call. On any provider failure the previous block body is kept
//! verbatim — a failed summarization must never lose data.

use std::time::Duration;

use indexmap::IndexMap;
use soul_llm::{complete_guarded, CompletionRequest, LlmProvider};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::model::Block;

const STATE_SYSTEM: &str =
    "You compress an agent's current consciousness state into a compact key:value block.";
const MEM_SYSTEM: &str =
    "You compress episodic memory deltas into a dense summary, preserving named entities.";

/// Fold `delta` into the previous STATE/MEM block body via `provider`,
/// within `byte_budget` and `timeout`. Returns the previous block unchanged
/// if the provider fails for any reason (this is the "preserve previous
/// block on failure" contract, not an error path for the caller).
pub async fn consolidate_llm_block(
    system: &str,
    previous: &Block,
    delta: &str,
    byte_budget: usize,
    provider: &dyn LlmProvider,
    cancel: Option<CancellationToken>,
    timeout: Duration,
) -> Block {
    if delta.trim().is_empty() {
        return previous.clone();
    }
    let request = CompletionRequest {
        system: system.to_string(),
        previous: previous.render(),
        delta: delta.to_string(),
        byte_budget,
    };
    match complete_guarded(provider, request, cancel, timeout).await {
        Ok(body) => Block {
            pairs: IndexMap::new(),
            raw: body,
        },
        Err(e) => {
            warn!(error = %e, "llm-assisted block consolidation failed, keeping previous block");
            previous.clone()
        }
    }
}

pub async fn consolidate_state(
    previous: &Block,
    delta: &str,
    byte_budget: usize,
    provider: &dyn LlmProvider,
    cancel: Option<CancellationToken>,
    timeout: Duration,
) -> Block {
    consolidate_llm_block(STATE_SYSTEM, previous, delta, byte_budget, provider, cancel, timeout)
        .await
}

pub async fn consolidate_mem(
    previous: &Block,
    delta: &str,
    byte_budget: usize,
    provider: &dyn LlmProvider,
    cancel: Option<CancellationToken>,
    timeout: Duration,
) -> Block {
    consolidate_llm_block(MEM_SYSTEM, previous, delta, byte_budget, provider, cancel, timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_llm::FallbackProvider;

    #[tokio::test]
    async fn preserves_previous_on_empty_delta() {
        let previous = Block {
            pairs: IndexMap::new(),
            raw: "calm".to_string(),
        };
        let result = consolidate_state(
            &previous,
            "",
            512,
            &FallbackProvider,
            None,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result.raw, "calm");
    }

    #[tokio::test]
    async fn folds_delta_with_fallback_provider() {
        let previous = Block {
            pairs: IndexMap::new(),
            raw: "calm, curious".to_string(),
        };
        let result = consolidate_state(
            &previous,
            "learned rust",
            512,
            &FallbackProvider,
            None,
            Duration::from_secs(1),
        )
        .await;
        assert!(result.raw.contains("calm, curious"));
        assert!(result.raw.contains("learned rust"));
    }

    #[tokio::test]
    async fn preserves_previous_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let previous = Block {
            pairs: IndexMap::new(),
            raw: "calm".to_string(),
        };
        let result = consolidate_state(
            &previous,
            "new info",
            512,
            &FallbackProvider,
            Some(token),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result.raw, "calm");
    }
}
