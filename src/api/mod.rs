//! Web API module for ERNI Agents
//!
//! Provides REST API endpoints for:
//! - Chat turns
//! - Health and readiness probes
//! - The agent graph

pub mod agents;
pub mod chat;
pub mod health;

use axum::extract::Extension;
use axum::Router;
use erni_core::Runner;
use std::sync::Arc;

pub use agents::agents_routes;
pub use chat::chat_routes;
pub use health::health_routes;

/// Shared handler state
pub struct ApiState {
    pub runner: Runner,
    /// Deployment name reported by `/health`
    pub environment: String,
    /// Whether an LLM API key was supplied
    pub llm_configured: bool,
}

/// Create the API router with all endpoints
pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(chat_routes())
        .merge(health_routes())
        .merge(agents_routes())
        .layer(Extension(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ApiState;
    use erni_core::{
        build_erni_registry, GuardrailCache, GuardrailEvaluator, LlmAgentCapability, LlmJudge,
        MemoryConversationStore, Runner,
    };
    use erni_llm::MockProvider;
    use erni_tools::{register_builtins, Catalog, ToolRegistry};
    use std::sync::Arc;
    use std::time::Duration;

    pub const ALL_CLEAR: &str = r#"{"reasoning": "fine", "is_relevant": true, "is_safe": true, "contains_pii": false, "pii_types": []}"#;

    /// State over scripted providers; the judge passes everything by default
    pub fn state(agent_model: Arc<MockProvider>, judge_model: Arc<MockProvider>) -> ApiState {
        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools, Arc::new(Catalog::default()));
        let tools = Arc::new(tools);
        let agents = Arc::new(build_erni_registry(&tools).unwrap());

        let capability = LlmAgentCapability::new(agent_model, tools, agents.clone());
        let guardrails = GuardrailEvaluator::new(
            Arc::new(LlmJudge::new(judge_model, "gpt-4o-mini")),
            Arc::new(GuardrailCache::new(100, Duration::from_secs(60))),
            Duration::from_secs(5),
        );
        let store = Arc::new(MemoryConversationStore::new(Duration::from_secs(60), 100));

        ApiState {
            runner: Runner::new(agents, Arc::new(capability), Arc::new(guardrails), store),
            environment: "test".to_string(),
            llm_configured: true,
        }
    }

    pub fn default_state() -> ApiState {
        state(
            Arc::new(MockProvider::new().with_default_tool_text("Hello from Triage")),
            Arc::new(MockProvider::new().with_default_completion(ALL_CLEAR)),
        )
    }
}
