//! ERNI Core - Agent Orchestration
//!
//! This crate provides the turn pipeline behind the ERNI customer assistant,
//! including:
//! - Agents: the specialist graph with declared handoffs and hooks
//! - Guardrails: relevance, jailbreak and PII checks with a verdict cache
//! - Runner: one turn from user message to persisted state
//! - Store: per-conversation state with TTL and size bounds
//! - Replication: cross-process context sharing and durable turn history
//! - EventBus: turn lifecycle broadcast

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod guardrail;
pub mod replication;
pub mod runner;
pub mod store;

pub use agents::erni::build_erni_registry;
pub use agents::{
    Agent, AgentRegistry, AgentRegistryBuilder, AgentSummary, HandoffEdge, HandoffHook,
    Instructions,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    GuardrailConfig, HistoryBackend, OutputPolicy, ReplicationConfig, RunnerConfig, StoreBackend,
    StoreConfig,
};
pub use error::{Error, Result};
pub use event_bus::{EventBus, TurnEvent};
pub use guardrail::{
    GuardrailCache, GuardrailCheck, GuardrailEvaluator, GuardrailInput, GuardrailKind,
    GuardrailResult, Judge, LlmJudge,
};
pub use replication::{
    ContextReplicator, ContextSnapshot, MemoryTurnHistory, ReplicatedConversation,
    ReplicationLayer, SqliteTurnHistory, TurnHistory,
};
pub use runner::{
    AgentCapability, AgentEvent, AgentRunOutput, EventType, HandoffDecision, LlmAgentCapability,
    MessageResponse, RunItem, Runner, TurnRequest, TurnResponse,
};
pub use store::{
    ConversationState, ConversationStore, MemoryConversationStore, SqliteConversationStore,
};
