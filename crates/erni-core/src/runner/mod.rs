//! Runner - Drives one conversational turn
//!
//! A turn moves through these steps:
//! 1. load or create the conversation state
//! 2. append the user message
//! 3. run the active agent's input guardrails; a trip ends the turn with a refusal
//! 4. invoke the active agent, following declared handoffs
//! 5. run the (possibly new) agent's output guardrails
//! 6. diff the context
//! 7. persist state and replicate
//!
//! The agent works on a turn-local copy of the state. Nothing is written
//! unless the turn reaches step 7, so a failed turn leaves the stored
//! conversation as it was. Turns on the same conversation are serialized.

mod capability;
mod events;
mod llm_agent;


pub use capability::{AgentCapability, AgentRunOutput, HandoffDecision, RunItem};
pub use events::{AgentEvent, EventType, MessageResponse, TurnRequest, TurnResponse};
pub use llm_agent::{LlmAgentCapability, DEFAULT_AGENT_MODEL};

use crate::agents::{Agent, AgentRegistry};
use crate::config::{OutputPolicy, RunnerConfig};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, TurnEvent};
use crate::guardrail::{GuardrailCheck, GuardrailEvaluator, GuardrailInput, GuardrailResult};
use crate::replication::ReplicationLayer;
use crate::store::{ConversationState, ConversationStore};
use dashmap::DashMap;
use erni_llm::{Message, MessageRole};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

fn new_conversation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Orchestrates turns across the agent graph
pub struct Runner {
    agents: Arc<AgentRegistry>,
    capability: Arc<dyn AgentCapability>,
    guardrails: Arc<GuardrailEvaluator>,
    store: Arc<dyn ConversationStore>,
    replication: Option<Arc<ReplicationLayer>>,
    event_bus: EventBus,
    config: RunnerConfig,
    output_policy: OutputPolicy,
    withheld_message: String,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Mutable bookkeeping of a turn in progress
struct TurnTrace {
    items: Vec<Message>,
    turn_start: usize,
    events: Vec<AgentEvent>,
    messages: Vec<MessageResponse>,
    checks: Vec<GuardrailCheck>,
}

impl TurnTrace {
    fn new(items: Vec<Message>) -> Self {
        let turn_start = items.len();
        Self {
            items,
            turn_start,
            events: Vec::new(),
            messages: Vec::new(),
            checks: Vec::new(),
        }
    }

    fn record(&mut self, item: &RunItem) {
        match item {
            RunItem::Message { agent, content } => {
                self.events.push(AgentEvent::message(agent, content));
                self.messages.push(MessageResponse {
                    content: content.clone(),
                    agent: agent.clone(),
                });
            }
            RunItem::ToolCall {
                agent,
                name,
                arguments,
                ..
            } => self.events.push(AgentEvent::tool_call(agent, name, arguments)),
            RunItem::ToolOutput { agent, output, .. } => {
                self.events.push(AgentEvent::tool_output(agent, output));
            }
        }
        self.items.push(item.to_input_item());
    }

    fn new_items(&self) -> &[Message] {
        &self.items[self.turn_start..]
    }

    fn produced_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace this turn's agent text with `notice`
    fn suppress(&mut self, agent: &str, notice: &str) {
        let start = self.turn_start;
        let mut index = 0;
        self.items.retain(|item| {
            let keep = index < start
                || !(item.role == MessageRole::Assistant && item.tool_calls.is_empty());
            index += 1;
            keep
        });
        self.items.push(Message::assistant(notice));
        self.events.retain(|e| e.event_type != EventType::Message);
        self.events.push(AgentEvent::message(agent, notice));
        self.messages = vec![MessageResponse {
            content: notice.to_string(),
            agent: agent.to_string(),
        }];
    }
}

impl Runner {
    /// Create a runner with default settings
    #[must_use]
    pub fn new(
        agents: Arc<AgentRegistry>,
        capability: Arc<dyn AgentCapability>,
        guardrails: Arc<GuardrailEvaluator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let defaults = crate::config::GuardrailConfig::default();
        Self {
            agents,
            capability,
            guardrails,
            store,
            replication: None,
            event_bus: EventBus::default(),
            config: RunnerConfig::default(),
            output_policy: defaults.output_policy,
            withheld_message: defaults.withheld_message,
            locks: DashMap::new(),
        }
    }

    /// Set turn settings
    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the output guardrail policy and the notice used when suppressing
    #[must_use]
    pub fn with_output_policy(
        mut self,
        policy: OutputPolicy,
        withheld_message: impl Into<String>,
    ) -> Self {
        self.output_policy = policy;
        self.withheld_message = withheld_message.into();
        self
    }

    /// Replicate contexts and history after each turn
    #[must_use]
    pub fn with_replication(mut self, replication: Arc<ReplicationLayer>) -> Self {
        self.replication = Some(replication);
        self
    }

    /// Publish lifecycle events on `bus`
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    /// Agent graph
    #[must_use]
    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    /// Lifecycle event bus
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Conversation store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Replication layer, if configured
    #[must_use]
    pub fn replication(&self) -> Option<&Arc<ReplicationLayer>> {
        self.replication.as_ref()
    }

    /// Handle one turn
    ///
    /// # Errors
    /// `Validation` for oversized messages. Capability failures and
    /// timeouts surface as-is; callers should show only
    /// [`Error::public_message`].
    #[instrument(skip_all, fields(conversation = request.conversation_id.as_deref().unwrap_or("new")))]
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnResponse> {
        let length = request.message.chars().count();
        if length > self.config.max_message_chars {
            return Err(Error::Validation(format!(
                "message too long: {length} characters (max {})",
                self.config.max_message_chars
            )));
        }

        let requested = request
            .conversation_id
            .filter(|id| !id.trim().is_empty());
        let lock_id = requested.clone().unwrap_or_else(new_conversation_id);
        let turn_id = Uuid::new_v4();

        let lock = self.conversation_lock(&lock_id);
        let result = {
            let _guard = lock.lock().await;
            self.execute_turn(turn_id, &lock_id, requested.is_some(), &request.message)
                .await
        };
        drop(lock);
        self.locks
            .remove_if(&lock_id, |_, l| Arc::strong_count(l) == 1);

        if let Err(e) = &result {
            error!(turn_id = %turn_id, error = %e, "Turn failed");
            self.event_bus.publish(TurnEvent::TurnFailed {
                turn_id,
                error: e.public_message(),
            });
        }
        result
    }

    fn conversation_lock(&self, id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            &self
                .locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Newest known state of a conversation
    ///
    /// The replicated copy replaces the local one when its revision is
    /// higher, so a worker with a stale local copy picks up turns handled
    /// elsewhere.
    async fn load(&self, id: &str) -> Option<ConversationState> {
        let local = match self.store.get(id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "Conversation store read failed");
                None
            }
        };
        let Some(replication) = &self.replication else {
            return local;
        };
        let known = local.as_ref().map(|s| s.revision);
        let Some(replicated) = replication.resume(id, known).await else {
            return local;
        };

        info!(
            conversation_id = %id,
            revision = replicated.revision,
            local_revision = ?known,
            items = replicated.history.len(),
            "Resuming replicated conversation"
        );
        let active_agent = replicated
            .active_agent
            .filter(|name| self.agents.resolve(name).is_ok())
            .unwrap_or_else(|| self.agents.routing_name().to_string());
        let input_items = if replicated.history.is_empty() {
            local.map(|s| s.input_items).unwrap_or_default()
        } else {
            replicated.history
        };
        Some(ConversationState {
            context: replicated.context,
            active_agent,
            input_items,
            revision: replicated.revision,
        })
    }

    async fn persist(&self, id: &str, state: &mut ConversationState, new_items: &[Message]) {
        state.revision += 1;
        if let Err(e) = self.store.save(id, state).await {
            warn!(conversation_id = %id, error = %e, "Conversation store write failed");
        }
        if let Some(replication) = &self.replication {
            replication.record_turn(id, state, new_items).await;
        }
    }

    fn active_agent(&self, name: &str) -> Arc<Agent> {
        self.agents.resolve(name).unwrap_or_else(|_| {
            warn!(agent = %name, "Stored agent no longer registered, routing instead");
            self.agents.routing_agent()
        })
    }

    fn response(
        &self,
        conversation_id: String,
        state: &ConversationState,
        trace: TurnTrace,
    ) -> TurnResponse {
        TurnResponse {
            conversation_id,
            current_agent: state.active_agent.clone(),
            messages: trace.messages,
            events: trace.events,
            context: state.context.to_map(),
            guardrail_checks: trace.checks,
            agents: self.agents.summaries(),
        }
    }

    async fn execute_turn(
        &self,
        turn_id: Uuid,
        lock_id: &str,
        requested: bool,
        message: &str,
    ) -> Result<TurnResponse> {
        let started = Instant::now();
        let existing = if requested { self.load(lock_id).await } else { None };
        let (conversation_id, mut state) = match existing {
            Some(state) => (lock_id.to_string(), state),
            None => {
                let id = if requested {
                    new_conversation_id()
                } else {
                    lock_id.to_string()
                };
                debug!(conversation_id = %id, "Starting conversation");
                (id, ConversationState::new(self.agents.routing_name()))
            }
        };

        if message.trim().is_empty() {
            self.persist(&conversation_id, &mut state, &[]).await;
            return Ok(self.response(conversation_id, &state, TurnTrace::new(Vec::new())));
        }

        let mut agent = self.active_agent(&state.active_agent);
        self.event_bus.publish(TurnEvent::TurnStarted {
            turn_id,
            conversation_id: conversation_id.clone(),
            agent: agent.name.clone(),
        });

        let mut trace = TurnTrace::new(state.input_items.clone());
        trace.items.push(Message::user(message));

        // Input guardrails see only the latest user message
        let mut tripped: Option<GuardrailResult> = None;
        for kind in &agent.input_guardrails {
            let result = self
                .guardrails
                .evaluate(*kind, &agent.name, GuardrailInput::Text(message))
                .await?;
            self.report_check(turn_id, &mut trace, &result, message);
            if !result.passed && tripped.is_none() {
                tripped = Some(result);
            }
        }

        if let Some(result) = tripped {
            info!(
                guardrail = %result.guardrail_name,
                agent = %agent.name,
                "Input refused"
            );
            let refusal = self.config.refusal_message.clone();
            trace.items.push(Message::assistant(&refusal));
            trace.messages.push(MessageResponse {
                content: refusal,
                agent: agent.name.clone(),
            });

            state.input_items = trace.items.clone();
            self.persist(&conversation_id, &mut state, trace.new_items()).await;
            self.event_bus.publish(TurnEvent::TurnCompleted {
                turn_id,
                agent: agent.name.clone(),
                refused: true,
                duration_ms: started.elapsed().as_millis() as u64,
            });
            return Ok(self.response(conversation_id, &state, trace));
        }

        let context_before = state.context.clone();
        let mut ctx = state.context.clone();
        let mut handoffs = 0;

        loop {
            let run = self.capability.run(&agent, &trace.items, &mut ctx);
            let output = tokio::time::timeout(self.config.generation_timeout(), run)
                .await
                .map_err(|_| Error::CapabilityTimeout {
                    operation: "generation",
                    timeout_ms: self.config.generation_timeout().as_millis() as u64,
                })??;

            for item in &output.new_items {
                trace.record(item);
            }

            let Some(decision) = output.handoff else {
                break;
            };
            if handoffs >= self.config.max_handoffs_per_turn {
                warn!(
                    agent = %agent.name,
                    target = %decision.target_agent,
                    "Handoff limit reached, staying with current agent"
                );
                break;
            }

            let edge = agent.handoff_to(&decision.target_agent).ok_or_else(|| {
                Error::Capability(format!(
                    "{} declared a handoff to '{}' outside its graph",
                    agent.name, decision.target_agent
                ))
            })?;
            let hook = decision.on_transition_hook.or(edge.hook);
            let target = self.agents.resolve(&decision.target_agent)?;

            trace.events.push(AgentEvent::handoff(&agent.name, &target.name));
            if let Some(hook) = hook {
                hook.apply(&mut ctx);
                trace.events.push(AgentEvent::hook(&target.name, hook.name()));
            }
            self.event_bus.publish(TurnEvent::HandoffApplied {
                turn_id,
                source_agent: agent.name.clone(),
                target_agent: target.name.clone(),
            });
            debug!(source = %agent.name, target = %target.name, "Handoff applied");

            agent = target;
            handoffs += 1;
        }

        let produced = trace.produced_text();
        if !produced.is_empty() {
            let mut flagged = false;
            for kind in &agent.output_guardrails {
                let result = self
                    .guardrails
                    .evaluate(*kind, &agent.name, GuardrailInput::Text(&produced))
                    .await?;
                self.report_check(turn_id, &mut trace, &result, &produced);
                flagged |= !result.passed;
            }
            if flagged {
                match self.output_policy {
                    OutputPolicy::Flag => info!(agent = %agent.name, "Output flagged"),
                    OutputPolicy::Suppress => {
                        info!(agent = %agent.name, "Output suppressed");
                        trace.suppress(&agent.name, &self.withheld_message);
                    }
                }
            }
        }

        for (field, value) in ctx.diff(&context_before) {
            trace
                .events
                .push(AgentEvent::context_update(&agent.name, &field, &value));
        }

        state.context = ctx;
        state.active_agent = agent.name.clone();
        state.input_items = trace.items.clone();
        self.persist(&conversation_id, &mut state, trace.new_items()).await;

        self.event_bus.publish(TurnEvent::TurnCompleted {
            turn_id,
            agent: agent.name.clone(),
            refused: false,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(self.response(conversation_id, &state, trace))
    }

    fn report_check(
        &self,
        turn_id: Uuid,
        trace: &mut TurnTrace,
        result: &GuardrailResult,
        input: &str,
    ) {
        self.event_bus.publish(TurnEvent::GuardrailEvaluated {
            turn_id,
            guardrail: result.guardrail_name.clone(),
            passed: result.passed,
        });
        trace.checks.push(GuardrailCheck::from_result(result, input));
    }
}
