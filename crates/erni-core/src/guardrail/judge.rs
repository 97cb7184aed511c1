//! Judge - External structured judgment behind the guardrails

use crate::error::{Error, Result};
use erni_llm::util::{extract_json_object, truncate_safe};
use erni_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use tracing::debug;

/// Produces a JSON verdict for guardrail instructions and an input text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Judge: Send + Sync {
    /// Judge `input` according to `instructions`
    async fn judge(&self, instructions: &str, input: &str) -> Result<serde_json::Value>;
}

/// Judge backed by a chat-completion model
pub struct LlmJudge {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmJudge {
    /// Create a judge with deterministic sampling and a 500-token budget
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: 500,
        }
    }

    /// Override sampling settings
    #[must_use]
    pub fn with_settings(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
impl Judge for LlmJudge {
    async fn judge(&self, instructions: &str, input: &str) -> Result<serde_json::Value> {
        let request = CompletionRequest::new(&self.model)
            .with_message(Message::system(instructions))
            .with_message(Message::user(input))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::Capability(e.to_string()))?;

        // Unparseable replies are returned as a plain string
        let value = extract_json_object(&response.content)
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_else(|| {
                debug!(
                    reply = %truncate_safe(&response.content, 200),
                    "Judge reply contained no JSON object"
                );
                serde_json::Value::String(response.content.clone())
            });
        Ok(value)
    }
}
