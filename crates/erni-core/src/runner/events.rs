//! Turn request/response and the per-turn event trace

use crate::agents::AgentSummary;
use crate::guardrail::GuardrailCheck;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Kind of observable occurrence within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Agent produced a message
    Message,
    /// Control moved to another agent
    Handoff,
    /// A tool or handoff hook was invoked
    ToolCall,
    /// A tool returned
    ToolOutput,
    /// A context field changed
    ContextUpdate,
}

/// One entry of the turn's event trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Unique event id
    pub id: String,
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Agent the event belongs to
    pub agent: String,
    /// Human-readable content
    pub content: String,
    /// Structured detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl AgentEvent {
    fn new(event_type: EventType, agent: &str, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            event_type,
            agent: agent.to_string(),
            content: content.into(),
            metadata: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn with_metadata(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.metadata = Some(map);
        }
        self
    }

    /// Message produced by `agent`
    #[must_use]
    pub fn message(agent: &str, content: &str) -> Self {
        Self::new(EventType::Message, agent, content)
    }

    /// Handoff from `source` to `target`
    #[must_use]
    pub fn handoff(source: &str, target: &str) -> Self {
        Self::new(EventType::Handoff, source, format!("{source} -> {target}"))
            .with_metadata(json!({ "source_agent": source, "target_agent": target }))
    }

    /// Handoff hook run on entering `target`
    #[must_use]
    pub fn hook(target: &str, hook_name: &str) -> Self {
        Self::new(EventType::ToolCall, target, hook_name)
    }

    /// Tool invocation
    #[must_use]
    pub fn tool_call(agent: &str, tool: &str, arguments: &Value) -> Self {
        Self::new(EventType::ToolCall, agent, tool).with_metadata(json!({ "tool_args": arguments }))
    }

    /// Tool result
    #[must_use]
    pub fn tool_output(agent: &str, output: &str) -> Self {
        Self::new(EventType::ToolOutput, agent, output)
            .with_metadata(json!({ "tool_result": output }))
    }

    /// Change of a single context field
    #[must_use]
    pub fn context_update(agent: &str, field: &str, value: &Value) -> Self {
        let mut changes = Map::new();
        changes.insert(field.to_string(), value.clone());
        Self::new(EventType::ContextUpdate, agent, "")
            .with_metadata(json!({ "changes": Value::Object(changes) }))
    }
}

/// Message returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text
    pub content: String,
    /// Agent that produced it
    pub agent: String,
}

/// Inbound turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Existing conversation, or `None` to start one
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// User message; empty initializes the conversation
    #[serde(default)]
    pub message: String,
}

impl TurnRequest {
    /// Turn on a new conversation
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            message: message.into(),
        }
    }

    /// Turn on an existing conversation
    #[must_use]
    pub fn continuing(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            message: message.into(),
        }
    }
}

/// Outcome of one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Conversation id
    pub conversation_id: String,
    /// Active agent after the turn
    pub current_agent: String,
    /// Messages produced this turn
    pub messages: Vec<MessageResponse>,
    /// Event trace in occurrence order
    pub events: Vec<AgentEvent>,
    /// Context fields after the turn
    pub context: Map<String, Value>,
    /// Input and output guardrail checks
    pub guardrail_checks: Vec<GuardrailCheck>,
    /// Agent graph
    pub agents: Vec<AgentSummary>,
}
