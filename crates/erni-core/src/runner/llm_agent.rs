//! Tool-calling agent backed by a chat-completion model
//!
//! Each handoff edge of the running agent is offered to the model as a
//! `transfer_to_<agent>` function. Calling one ends the run with a
//! [`HandoffDecision`]; every other call is dispatched to the tool registry
//! against the turn-local context.

use super::capability::{AgentCapability, AgentRunOutput, HandoffDecision, RunItem};
use crate::agents::{transfer_function_name, Agent, AgentRegistry, HandoffEdge};
use crate::error::{Error, Result};
use erni_llm::{
    CompletionRequest, LlmProvider, Message, ToolCall, ToolCompletionRequest, ToolDefinition,
};
use erni_tools::{BuildingProjectContext, ToolRegistry};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Default model for task agents
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";

/// [`AgentCapability`] implementation driving an [`LlmProvider`]
pub struct LlmAgentCapability {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    agents: Arc<AgentRegistry>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_tool_iterations: usize,
}

impl LlmAgentCapability {
    /// Create a capability with the default model settings
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        agents: Arc<AgentRegistry>,
    ) -> Self {
        Self {
            provider,
            tools,
            agents,
            model: DEFAULT_AGENT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            max_tool_iterations: 8,
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set sampling temperature and output budget
    #[must_use]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set how many tool rounds one agent run may take
    #[must_use]
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    fn transfer_definition(&self, edge: &HandoffEdge) -> ToolDefinition {
        let description = self
            .agents
            .resolve(&edge.target)
            .map(|agent| agent.description.clone())
            .unwrap_or_default();
        ToolDefinition::new(
            transfer_function_name(&edge.target),
            format!("Handoff to the {}. {}", edge.target, description),
            json!({ "type": "object", "properties": {}, "additionalProperties": false }),
        )
    }

    async fn call_tool(
        &self,
        agent: &Agent,
        call: &ToolCall,
        ctx: &mut BuildingProjectContext,
    ) -> String {
        if !agent.tools.iter().any(|t| t == &call.name) {
            warn!(agent = %agent.name, tool = %call.name, "Model called a tool the agent does not own");
            return format!("❌ Error: tool '{}' is not available", call.name);
        }
        match self.tools.execute(&call.name, call.arguments_value(), ctx).await {
            Ok(result) => result.output,
            Err(e) => {
                debug!(tool = %call.name, error = %e, "Tool call rejected");
                format!("❌ Error: {e}")
            }
        }
    }
}

#[async_trait::async_trait]
impl AgentCapability for LlmAgentCapability {
    #[instrument(skip_all, fields(agent = %agent.name))]
    async fn run(
        &self,
        agent: &Agent,
        input_items: &[Message],
        ctx: &mut BuildingProjectContext,
    ) -> Result<AgentRunOutput> {
        let mut definitions = self.tools.to_llm_tools(&agent.tools);
        definitions.extend(agent.handoffs.iter().map(|e| self.transfer_definition(e)));

        let mut messages = Vec::with_capacity(input_items.len() + 1);
        messages.push(Message::system(agent.instructions.render(ctx)));
        messages.extend(input_items.iter().cloned());

        let mut output = AgentRunOutput::default();

        for iteration in 0..self.max_tool_iterations {
            let request = ToolCompletionRequest::new(
                CompletionRequest::new(&self.model)
                    .with_messages(messages.clone())
                    .with_temperature(self.temperature)
                    .with_max_tokens(self.max_tokens),
                definitions.clone(),
            );

            let response = self.provider.complete_with_tools(request).await.map_err(|e| {
                error!(agent = %agent.name, error = %e, "Generation failed");
                Error::Capability(e.to_string())
            })?;

            let text = response
                .content
                .clone()
                .filter(|text| !text.trim().is_empty());
            if let Some(content) = &text {
                output.new_items.push(RunItem::Message {
                    agent: agent.name.clone(),
                    content: content.clone(),
                });
            }

            if !response.has_tool_calls() {
                return Ok(output);
            }

            // A transfer ends the run; sibling calls in the same response are dropped
            if let Some((call, edge)) = response.tool_calls.iter().find_map(|call| {
                agent
                    .handoffs
                    .iter()
                    .find(|edge| transfer_function_name(&edge.target) == call.name)
                    .map(|edge| (call, edge))
            }) {
                debug!(call_id = %call.id, target = %edge.target, "Model requested handoff");
                output.handoff = Some(HandoffDecision {
                    target_agent: edge.target.clone(),
                    on_transition_hook: edge.hook,
                });
                return Ok(output);
            }

            debug!(iteration, calls = response.tool_calls.len(), "Executing tool calls");
            for call in &response.tool_calls {
                let arguments = call.arguments_value();
                output.new_items.push(RunItem::ToolCall {
                    agent: agent.name.clone(),
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments,
                });
                messages.push(Message::assistant_with_tool_calls(
                    text.clone().unwrap_or_default(),
                    vec![call.clone()],
                ));

                let result = self.call_tool(agent, call, ctx).await;
                messages.push(Message::tool_response(&call.id, &result));
                output.new_items.push(RunItem::ToolOutput {
                    agent: agent.name.clone(),
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    output: result,
                });
            }
        }

        Err(Error::Capability(format!(
            "{} exceeded {} tool rounds",
            agent.name, self.max_tool_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::erni::{build_erni_registry, COST_ESTIMATION, FAQ, TRIAGE};
    use crate::agents::HandoffHook;
    use erni_llm::{MockProvider, ToolCompletionResponse};
    use erni_tools::{register_builtins, Catalog};

    fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn setup() -> (Arc<MockProvider>, LlmAgentCapability, Arc<AgentRegistry>) {
        let mut tools = ToolRegistry::new();
        register_builtins(&mut tools, Arc::new(Catalog::default()));
        let agents = Arc::new(build_erni_registry(&tools).unwrap());
        let provider = Arc::new(MockProvider::new());
        let capability = LlmAgentCapability::new(provider.clone(), Arc::new(tools), agents.clone());
        (provider, capability, agents)
    }

    #[tokio::test]
    async fn test_plain_reply() {
        let (provider, capability, agents) = setup();
        provider.add_tool_response(ToolCompletionResponse::text("Hello! How can I help?"));

        let triage = agents.resolve(TRIAGE).unwrap();
        let mut ctx = BuildingProjectContext::new();
        let output = capability
            .run(&triage, &[Message::user("Hello")], &mut ctx)
            .await
            .unwrap();

        assert!(output.handoff.is_none());
        assert_eq!(
            output.new_items,
            vec![RunItem::Message {
                agent: TRIAGE.into(),
                content: "Hello! How can I help?".into()
            }]
        );

        let requests = provider.tool_requests();
        let names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"transfer_to_cost_estimation_agent"));
        assert_eq!(requests[0].request.temperature, Some(0.7));
        assert_eq!(requests[0].request.max_tokens, Some(2000));
    }

    #[tokio::test]
    async fn test_transfer_returns_handoff_with_hook() {
        let (provider, capability, agents) = setup();
        provider.add_tool_response(ToolCompletionResponse::calls(vec![call(
            "call_1",
            "transfer_to_cost_estimation_agent",
            json!({}),
        )]));

        let triage = agents.resolve(TRIAGE).unwrap();
        let mut ctx = BuildingProjectContext::new();
        let output = capability
            .run(&triage, &[Message::user("What does a house cost?")], &mut ctx)
            .await
            .unwrap();

        assert_eq!(
            output.handoff,
            Some(HandoffDecision {
                target_agent: COST_ESTIMATION.into(),
                on_transition_hook: Some(HandoffHook::CostEstimationIntake),
            })
        );
        assert!(output.new_items.is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_mutates_context() {
        let (provider, capability, agents) = setup();
        provider.add_tool_response(ToolCompletionResponse::calls(vec![call(
            "call_1",
            "estimate_project_cost",
            json!({"project_type": "Einfamilienhaus", "area_sqm": 150, "construction_type": "Holzbau"}),
        )]));
        provider.add_tool_response(ToolCompletionResponse::text("About CHF 450,000."));

        let agent = agents.resolve(COST_ESTIMATION).unwrap();
        let mut ctx = BuildingProjectContext::new();
        let output = capability
            .run(&agent, &[Message::user("150 sqm Holzbau")], &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.area_sqm(), Some(150.0));
        assert_eq!(ctx.budget_chf(), Some(450_000.0));
        assert_eq!(output.new_items.len(), 3);
        assert!(matches!(&output.new_items[1], RunItem::ToolOutput { output, .. } if output.contains("450,000")));

        // Second round sees the call and its output
        let second = &provider.tool_requests()[1];
        let tool_msg = second.request.messages.last().unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_foreign_tool_is_refused() {
        let (provider, capability, agents) = setup();
        provider.add_tool_response(ToolCompletionResponse::calls(vec![call(
            "call_1",
            "book_consultation",
            json!({}),
        )]));
        provider.add_tool_response(ToolCompletionResponse::text("Sorry."));

        let faq = agents.resolve(FAQ).unwrap();
        let mut ctx = BuildingProjectContext::new();
        let before = ctx.clone();
        let output = capability
            .run(&faq, &[Message::user("Book me")], &mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx, before);
        assert!(matches!(&output.new_items[1], RunItem::ToolOutput { output, .. } if output.starts_with("❌ Error")));
    }

    #[tokio::test]
    async fn test_provider_failure_is_capability_error() {
        let (provider, capability, agents) = setup();
        provider.add_tool_failure("boom");

        let triage = agents.resolve(TRIAGE).unwrap();
        let err = capability
            .run(&triage, &[Message::user("Hi")], &mut BuildingProjectContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capability(_)));
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let (provider, capability, agents) = setup();
        let capability = capability.with_max_tool_iterations(2);
        for i in 0..2 {
            provider.add_tool_response(ToolCompletionResponse::calls(vec![call(
                &format!("call_{i}"),
                "faq_lookup_building",
                json!({"question": "wood"}),
            )]));
        }

        let faq = agents.resolve(FAQ).unwrap();
        let err = capability
            .run(&faq, &[Message::user("wood?")], &mut BuildingProjectContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Capability(msg) if msg.contains("2 tool rounds")));
    }
}
