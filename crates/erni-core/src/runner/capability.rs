//! Agent invocation seam
//!
//! The runner never talks to a model directly. It hands the active agent,
//! the accumulated turn items and a turn-local context to an
//! [`AgentCapability`] and applies whatever handoff comes back.

use crate::agents::{Agent, HandoffHook};
use crate::error::Result;
use erni_llm::{Message, ToolCall};
use erni_tools::BuildingProjectContext;
use serde_json::Value;

/// An item produced while an agent runs
#[derive(Debug, Clone, PartialEq)]
pub enum RunItem {
    /// Text for the customer
    Message {
        /// Producing agent
        agent: String,
        /// Text
        content: String,
    },
    /// Tool invocation
    ToolCall {
        /// Calling agent
        agent: String,
        /// Call id, pairs the call with its output
        call_id: String,
        /// Tool name
        name: String,
        /// Parsed arguments
        arguments: Value,
    },
    /// Tool result
    ToolOutput {
        /// Calling agent
        agent: String,
        /// Call id of the matching `ToolCall`
        call_id: String,
        /// Tool name
        name: String,
        /// Result text
        output: String,
    },
}

impl RunItem {
    /// Turn item to append to the conversation's input items
    #[must_use]
    pub fn to_input_item(&self) -> Message {
        match self {
            Self::Message { content, .. } => Message::assistant(content.clone()),
            Self::ToolCall {
                call_id,
                name,
                arguments,
                ..
            } => Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: call_id.clone(),
                    name: name.clone(),
                    arguments: arguments.to_string(),
                }],
            ),
            Self::ToolOutput {
                call_id, output, ..
            } => Message::tool_response(call_id.clone(), output.clone()),
        }
    }
}

/// A declared transfer of control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffDecision {
    /// Agent that takes over
    pub target_agent: String,
    /// Hook applied to the context before the target runs
    pub on_transition_hook: Option<HandoffHook>,
}

/// What one agent invocation produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentRunOutput {
    /// Items in production order
    pub new_items: Vec<RunItem>,
    /// Handoff, if the agent declared one
    pub handoff: Option<HandoffDecision>,
}

/// Runs one agent over the turn's input items
#[async_trait::async_trait]
pub trait AgentCapability: Send + Sync {
    /// Invoke `agent`. Tool calls mutate `ctx` in place.
    async fn run(
        &self,
        agent: &Agent,
        input_items: &[Message],
        ctx: &mut BuildingProjectContext,
    ) -> Result<AgentRunOutput>;
}
