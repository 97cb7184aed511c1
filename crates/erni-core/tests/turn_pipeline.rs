//! End-to-end turns through the model-backed capability and judge

use erni_core::agents::erni::{COST_ESTIMATION, TRIAGE};
use erni_core::agents::transfer_function_name;
use erni_core::{
    build_erni_registry, ConversationStore, EventType, GuardrailCache, GuardrailEvaluator,
    LlmAgentCapability, LlmJudge, MemoryConversationStore, Runner, SqliteConversationStore,
    TurnRequest,
};
use erni_llm::{MessageRole, MockProvider, ToolCall, ToolCompletionResponse};
use erni_tools::{register_builtins, Catalog, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;

const ALL_CLEAR: &str = r#"{"reasoning": "fine", "is_relevant": true, "is_safe": true, "contains_pii": false, "pii_types": []}"#;

fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

struct Stack {
    runner: Runner,
    agent_model: Arc<MockProvider>,
    judge_model: Arc<MockProvider>,
}

fn stack(store: Arc<dyn ConversationStore>) -> Stack {
    let mut tools = ToolRegistry::new();
    register_builtins(&mut tools, Arc::new(Catalog::default()));
    let tools = Arc::new(tools);
    let agents = Arc::new(build_erni_registry(&tools).unwrap());

    let agent_model = Arc::new(MockProvider::new());
    let judge_model = Arc::new(MockProvider::new().with_default_completion(ALL_CLEAR));

    let capability = Arc::new(LlmAgentCapability::new(
        agent_model.clone(),
        tools,
        agents.clone(),
    ));
    let guardrails = Arc::new(GuardrailEvaluator::new(
        Arc::new(LlmJudge::new(judge_model.clone(), "gpt-4o-mini")),
        Arc::new(GuardrailCache::new(100, Duration::from_secs(3600))),
        Duration::from_secs(5),
    ));

    Stack {
        runner: Runner::new(agents, capability, guardrails, store),
        agent_model,
        judge_model,
    }
}

fn memory_stack() -> Stack {
    stack(Arc::new(MemoryConversationStore::new(
        Duration::from_secs(3600),
        100,
    )))
}

#[tokio::test]
async fn test_cost_estimate_through_model() {
    let s = memory_stack();
    s.agent_model
        .add_tool_response(ToolCompletionResponse::calls(vec![call(
            "call_t",
            &transfer_function_name(COST_ESTIMATION),
            "{}",
        )]));
    s.agent_model
        .add_tool_response(ToolCompletionResponse::calls(vec![call(
            "call_e",
            "estimate_project_cost",
            r#"{"project_type": "Einfamilienhaus", "area_sqm": 150, "construction_type": "Holzbau"}"#,
        )]));
    s.agent_model.add_tool_response(ToolCompletionResponse::text(
        "A 150 m² Holzbau house comes to roughly CHF 450,000.",
    ));

    let response = s
        .runner
        .run_turn(TurnRequest::new(
            "What would a 150 sqm Einfamilienhaus in Holzbau cost?",
        ))
        .await
        .unwrap();

    assert_eq!(response.current_agent, COST_ESTIMATION);
    assert_eq!(response.context["budget_chf"], 450_000.0);
    assert_eq!(response.messages.len(), 1);
    assert_eq!(response.messages[0].agent, COST_ESTIMATION);

    let types: Vec<EventType> = response.events.iter().map(|e| e.event_type).collect();
    assert_eq!(types[0], EventType::Handoff);
    assert_eq!(types[1], EventType::ToolCall);
    assert_eq!(response.events[1].content, "on_cost_estimation_handoff");
    assert!(types.contains(&EventType::ToolOutput));
    assert!(types.contains(&EventType::ContextUpdate));

    // The specialist saw its own rendered instructions
    let requests = s.agent_model.tool_requests();
    assert_eq!(requests.len(), 3);
    let system = &requests[1].request.messages[0];
    assert_eq!(system.role, MessageRole::System);
    assert!(system
        .content
        .contains(response.context["inquiry_id"].as_str().unwrap()));

    // Relevance and jailbreak on the input, PII on the reply
    assert_eq!(s.judge_model.completion_calls(), 3);
}

#[tokio::test]
async fn test_judge_outage_refuses_conservatively() {
    let s = memory_stack();
    s.judge_model.add_completion("I cannot answer in JSON today.");

    let response = s
        .runner
        .run_turn(TurnRequest::new("Tell me about timber construction"))
        .await
        .unwrap();

    assert_eq!(response.current_agent, TRIAGE);
    assert_eq!(
        response.messages[0].content,
        "Sorry, I can only answer questions related to building and construction."
    );
    assert!(!response.guardrail_checks[0].passed);
    assert_eq!(s.agent_model.tool_calls(), 0);
}

#[tokio::test]
async fn test_model_failure_surfaces_as_internal_error() {
    let s = memory_stack();
    s.agent_model.add_tool_failure("upstream unavailable");

    let err = s
        .runner
        .run_turn(TurnRequest::new("Hello"))
        .await
        .unwrap_err();
    assert!(!err.is_client_error());
    assert_eq!(err.public_message(), "internal error");
}

#[tokio::test]
async fn test_sqlite_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    let first = {
        let store = SqliteConversationStore::open(&path, Duration::from_secs(3600), 100)
            .await
            .unwrap();
        let s = stack(Arc::new(store));
        s.agent_model
            .add_tool_response(ToolCompletionResponse::calls(vec![call(
                "call_t",
                &transfer_function_name(COST_ESTIMATION),
                "{}",
            )]));
        s.agent_model
            .add_tool_response(ToolCompletionResponse::text("Which construction type?"));
        s.runner
            .run_turn(TurnRequest::new("I need a cost estimate"))
            .await
            .unwrap()
    };

    let store = SqliteConversationStore::open(&path, Duration::from_secs(3600), 100)
        .await
        .unwrap();
    let s = stack(Arc::new(store));
    s.agent_model
        .add_tool_response(ToolCompletionResponse::text("Noted, Holzbau."));
    let second = s
        .runner
        .run_turn(TurnRequest::continuing(&first.conversation_id, "Holzbau"))
        .await
        .unwrap();

    assert_eq!(second.conversation_id, first.conversation_id);
    assert_eq!(second.current_agent, COST_ESTIMATION);
    assert_eq!(second.context["inquiry_id"], first.context["inquiry_id"]);

    // Prior turn items were sent back to the model
    let request = &s.agent_model.tool_requests()[0];
    assert!(request
        .request
        .messages
        .iter()
        .any(|m| m.content == "I need a cost estimate"));
}
