//! Deterministic offline provider. Used in tests and whenever no hosted
//! provider is configured, so a Seed Engine run never hard-fails just
//! because there is no API key in the environment — the previous block is
//! still the fallback-of-last-resort at the consolidate layer, but this
//! gives callers a way to exercise the full pipeline without network
//! access.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::provider::{CompletionRequest, LlmError, LlmProvider, LlmResult};

pub struct FallbackProvider;

#[async_trait]
impl LlmProvider for FallbackProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: Option<CancellationToken>,
        _timeout: Duration,
    ) -> LlmResult<String> {
        if let Some(token) = &cancel {
            if token.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
        }
        let mut combined = if request.previous.trim().is_empty() {
            request.delta.clone()
        } else {
            format!("{}\n{}", request.previous.trim(), request.delta.trim())
        };
        if combined.len() > request.byte_budget {
            combined.truncate(request.byte_budget);
        }
        Ok(combined)
    }
}
