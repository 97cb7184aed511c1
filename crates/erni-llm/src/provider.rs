//! The provider seam between the agents and a chat-completion service

use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::Result;

/// A chat-completion backend
///
/// Agents call [`complete_with_tools`](Self::complete_with_tools) with their
/// tools and transfer functions. Guardrail judgment only needs
/// [`complete`](Self::complete).
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Model used when a request leaves `model` empty
    fn default_model(&self) -> &str;

    /// Plain text completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Completion that may answer with tool calls instead of text
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}
