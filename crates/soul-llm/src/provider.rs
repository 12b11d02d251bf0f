//! LLM provider trait.
//!
//! Only a single-shot completion is needed here (the Seed Engine's
//! LLM-assisted blocks are not conversational), so this is a narrower
//! surface than a full chat/tool-calling provider: one request, one
//! response, cancellable and timeout-bounded.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("context overflow: {0}")]
    ContextOverflow(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A single completion request: the previous block body, the delta to fold
/// in, and a soft byte budget the response should respect.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub previous: String,
    pub delta: String,
    pub byte_budget: usize,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Produce a new block body from `request`. `cancel`, if triggered,
    /// must cause this to return `LlmError::Cancelled` promptly; `timeout`
    /// bounds the call regardless of cancellation.
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: Option<CancellationToken>,
        timeout: Duration,
    ) -> LlmResult<String>;
}

/// Runs `provider.complete` under both the cancellation token and the
/// timeout, returning whichever fires first. Shared so every call site gets
/// the same cooperative-cancellation behavior without repeating the
/// `tokio::select!`.
pub async fn complete_guarded(
    provider: &dyn LlmProvider,
    request: CompletionRequest,
    cancel: Option<CancellationToken>,
    timeout: Duration,
) -> LlmResult<String> {
    let fut = provider.complete(request, cancel.clone(), timeout);
    tokio::select! {
        result = fut => result,
        _ = tokio::time::sleep(timeout) => Err(LlmError::TimedOut(timeout)),
        _ = cancel_or_pending(cancel) => Err(LlmError::Cancelled),
    }
}

async fn cancel_or_pending(cancel: Option<CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
