//! Mock LLM Provider for testing
//!
//! Returns queued responses in FIFO order, then falls back to configurable
//! defaults. Every request is recorded so tests can assert on call counts and
//! on what the caller sent.

use crate::completion::{
    CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse,
};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted outcome for a provider call
#[derive(Debug, Clone)]
enum Scripted<T> {
    Reply(T),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    completions: VecDeque<Scripted<CompletionResponse>>,
    tool_responses: VecDeque<Scripted<ToolCompletionResponse>>,
    completion_requests: Vec<CompletionRequest>,
    tool_requests: Vec<ToolCompletionRequest>,
}

/// A mock LLM provider that returns queued responses or default ones.
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    default_completion: String,
    default_tool_text: String,
    delay: Option<Duration>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            default_completion: "mock response".to_string(),
            default_tool_text: "mock response".to_string(),
            delay: None,
        }
    }

    /// Text returned by `complete` once the queue is drained.
    #[must_use]
    pub fn with_default_completion(mut self, text: impl Into<String>) -> Self {
        self.default_completion = text.into();
        self
    }

    /// Text returned by `complete_with_tools` once the queue is drained.
    #[must_use]
    pub fn with_default_tool_text(mut self, text: impl Into<String>) -> Self {
        self.default_tool_text = text.into();
        self
    }

    /// Sleep before answering every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a text completion.
    pub fn add_completion(&self, content: impl Into<String>) {
        self.lock()
            .completions
            .push_back(Scripted::Reply(CompletionResponse::text(content)));
    }

    /// Queue a failing text completion.
    pub fn add_completion_failure(&self, message: impl Into<String>) {
        self.lock()
            .completions
            .push_back(Scripted::Fail(message.into()));
    }

    /// Queue a tool-capable response.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.lock()
            .tool_responses
            .push_back(Scripted::Reply(response));
    }

    /// Queue a failing tool-capable response.
    pub fn add_tool_failure(&self, message: impl Into<String>) {
        self.lock()
            .tool_responses
            .push_back(Scripted::Fail(message.into()));
    }

    /// Number of `complete` calls received so far.
    #[must_use]
    pub fn completion_calls(&self) -> usize {
        self.lock().completion_requests.len()
    }

    /// Number of `complete_with_tools` calls received so far.
    #[must_use]
    pub fn tool_calls(&self) -> usize {
        self.lock().tool_requests.len()
    }

    /// Requests passed to `complete_with_tools`, oldest first.
    #[must_use]
    pub fn tool_requests(&self) -> Vec<ToolCompletionRequest> {
        self.lock().tool_requests.clone()
    }

    /// Requests passed to `complete`, oldest first.
    #[must_use]
    pub fn completion_requests(&self) -> Vec<CompletionRequest> {
        self.lock().completion_requests.clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let scripted = {
            let mut state = self.lock();
            state.completion_requests.push(request);
            state.completions.pop_front()
        };
        self.pause().await;

        match scripted {
            Some(Scripted::Reply(resp)) => Ok(resp),
            Some(Scripted::Fail(msg)) => Err(Error::Api(msg)),
            None => Ok(CompletionResponse::text(self.default_completion.clone())),
        }
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let scripted = {
            let mut state = self.lock();
            state.tool_requests.push(request);
            state.tool_responses.pop_front()
        };
        self.pause().await;

        match scripted {
            Some(Scripted::Reply(resp)) => Ok(resp),
            Some(Scripted::Fail(msg)) => Err(Error::Api(msg)),
            None => Ok(ToolCompletionResponse::text(self.default_tool_text.clone())),
        }
    }
}
