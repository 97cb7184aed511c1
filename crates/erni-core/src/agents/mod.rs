//! Agents - Declarations and the handoff graph
//!
//! An [`Agent`] is pure data: a name, the tools and guardrails it may use,
//! how to produce its instructions, and which agents it may hand off to.
//! Agents are collected into an [`AgentRegistry`], which validates the
//! graph once at startup and is read-only afterwards.

pub mod erni;
mod registry;

pub use registry::{AgentRegistry, AgentRegistryBuilder};

use crate::guardrail::GuardrailKind;
use erni_tools::BuildingProjectContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction producer
#[derive(Clone)]
pub enum Instructions {
    /// Fixed text
    Static(String),
    /// Text rendered from the current context
    Dynamic(fn(&BuildingProjectContext) -> String),
}

impl Instructions {
    /// Render instructions for the given context
    #[must_use]
    pub fn render(&self, ctx: &BuildingProjectContext) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Dynamic(render) => render(ctx),
        }
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(&text.len()).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}

/// Side effect run on the context when control transfers to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffHook {
    /// Entering cost estimation
    CostEstimationIntake,
    /// Entering appointment booking
    AppointmentIntake,
}

impl HandoffHook {
    /// Callback name reported in the event trace
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CostEstimationIntake => "on_cost_estimation_handoff",
            Self::AppointmentIntake => "on_appointment_handoff",
        }
    }

    /// Apply the hook. Both hooks guarantee an inquiry id.
    pub fn apply(&self, ctx: &mut BuildingProjectContext) {
        match self {
            Self::CostEstimationIntake | Self::AppointmentIntake => {
                ctx.ensure_inquiry_id();
            }
        }
    }
}

/// An allowed handoff from one agent to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffEdge {
    /// Target agent name
    pub target: String,
    /// Hook run before control transfers
    pub hook: Option<HandoffHook>,
}

/// Function name the model calls to transfer to `agent_name`
#[must_use]
pub fn transfer_function_name(agent_name: &str) -> String {
    let mut name = String::from("transfer_to_");
    let mut last_underscore = true;
    for ch in agent_name.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            name.push('_');
            last_underscore = true;
        }
    }
    if name.ends_with('_') {
        name.pop();
    }
    name
}

/// A task agent
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique name
    pub name: String,
    /// Short description shown to other agents when offering a handoff
    pub description: String,
    /// Instruction producer
    pub instructions: Instructions,
    /// Tool names, in order
    pub tools: Vec<String>,
    /// Input guardrails, in evaluation order
    pub input_guardrails: Vec<GuardrailKind>,
    /// Output guardrails, in evaluation order
    pub output_guardrails: Vec<GuardrailKind>,
    /// Handoff targets, in order
    pub handoffs: Vec<HandoffEdge>,
}

impl Agent {
    /// Create an agent with no tools, guardrails or handoffs
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: Instructions,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions,
            tools: Vec::new(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    /// Add a tool
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    /// Add an input guardrail
    #[must_use]
    pub fn with_input_guardrail(mut self, kind: GuardrailKind) -> Self {
        self.input_guardrails.push(kind);
        self
    }

    /// Add an output guardrail
    #[must_use]
    pub fn with_output_guardrail(mut self, kind: GuardrailKind) -> Self {
        self.output_guardrails.push(kind);
        self
    }

    /// Add a handoff target
    #[must_use]
    pub fn with_handoff(mut self, target: impl Into<String>) -> Self {
        self.handoffs.push(HandoffEdge {
            target: target.into(),
            hook: None,
        });
        self
    }

    /// Add a handoff target with a hook
    #[must_use]
    pub fn with_handoff_hook(mut self, target: impl Into<String>, hook: HandoffHook) -> Self {
        self.handoffs.push(HandoffEdge {
            target: target.into(),
            hook: Some(hook),
        });
        self
    }

    /// Edge to `target`, if this agent may hand off to it
    #[must_use]
    pub fn handoff_to(&self, target: &str) -> Option<&HandoffEdge> {
        self.handoffs.iter().find(|edge| edge.target == target)
    }

    /// Summary for API listings
    #[must_use]
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            handoffs: self.handoffs.iter().map(|e| e.target.clone()).collect(),
            tools: self.tools.clone(),
            input_guardrails: self
                .input_guardrails
                .iter()
                .map(|g| g.name().to_string())
                .collect(),
        }
    }
}

/// Public view of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent name
    pub name: String,
    /// Agent description
    pub description: String,
    /// Handoff target names
    pub handoffs: Vec<String>,
    /// Tool names
    pub tools: Vec<String>,
    /// Input guardrail names
    pub input_guardrails: Vec<String>,
}
