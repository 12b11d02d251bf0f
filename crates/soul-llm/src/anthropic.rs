//! Minimal Anthropic Messages API provider, single-shot: the Seed Engine
//! never needs a token stream, only a final string within a byte budget.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::provider::{CompletionRequest, LlmError, LlmProvider, LlmResult};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: Option<CancellationToken>,
        timeout: Duration,
    ) -> LlmResult<String> {
        if let Some(token) = &cancel {
            if token.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
        }

        let user_content = format!(
            "Previous block:\n{}\n\nNew information to fold in:\n{}\n\nRespond with the updated block body only, at most {} bytes.",
            request.previous, request.delta, request.byte_budget
        );

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 512,
            system: request.system.clone(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_content,
            }],
        };

        debug!(model = %body.model, "seed consolidation llm request");

        let send = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| LlmError::TimedOut(timeout))??;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, body = %error_text, "anthropic request failed");
            return match status.as_u16() {
                401 => Err(LlmError::AuthFailed(error_text)),
                429 => Err(LlmError::RateLimited {
                    retry_after_ms: 60_000,
                }),
                _ => Err(LlmError::RequestFailed(format!("{status}: {error_text}"))),
            };
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut text = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        if text.len() > request.byte_budget {
            text.truncate(request.byte_budget);
        }
        Ok(text)
    }
}
