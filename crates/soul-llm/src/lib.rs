pub mod anthropic;
pub mod fallback;
pub mod provider;

pub use fallback::FallbackProvider;
pub use provider::{complete_guarded, CompletionRequest, LlmError, LlmProvider, LlmResult};
