//! Server initialization
//!
//! Builds the tool registry, agent graph, guardrails, stores and runner from
//! [`AppConfig`], then serves the HTTP API until Ctrl+C.

use super::config::{AppConfig, LlmConfig};
use crate::api::{api_router, ApiState};
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use erni_core::{
    build_erni_registry, AgentRegistry, ContextReplicator, ConversationStore, GuardrailCache,
    GuardrailEvaluator, HistoryBackend, LlmAgentCapability, LlmJudge, MemoryConversationStore,
    MemoryTurnHistory, ReplicationLayer, Runner, SqliteConversationStore, SqliteTurnHistory,
    StoreBackend, TurnHistory,
};
use erni_llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use erni_tools::{register_builtins, Catalog, ToolRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Tool registry over the configured catalog
pub fn build_tools(config: &AppConfig) -> Result<Arc<ToolRegistry>> {
    let catalog = match &config.catalog.path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog override");
            Catalog::from_json_file(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?
        }
        None => Catalog::default(),
    };
    let mut tools = ToolRegistry::new();
    register_builtins(&mut tools, Arc::new(catalog));
    Ok(Arc::new(tools))
}

/// Validated agent graph
pub fn build_agents(tools: &ToolRegistry) -> Result<Arc<AgentRegistry>> {
    let agents = build_erni_registry(tools).context("Agent graph is invalid")?;
    Ok(Arc::new(agents))
}

/// OpenAI provider; `false` when no API key is set
fn build_provider(config: &LlmConfig) -> (Arc<dyn LlmProvider>, bool) {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let configured = !api_key.trim().is_empty();
    if !configured {
        warn!("OPENAI_API_KEY is not set; turns will fail until it is configured");
    }

    let mut openai = OpenAiConfig::new(api_key)
        .with_model(&config.model)
        .with_timeout(Duration::from_secs(config.request_timeout_secs));
    if let Some(url) = &config.base_url {
        openai = openai.with_base_url(url);
    }
    (Arc::new(OpenAiProvider::new(openai)), configured)
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn ConversationStore>> {
    let store = &config.store;
    Ok(match store.backend {
        StoreBackend::Memory => Arc::new(MemoryConversationStore::new(
            store.ttl(),
            store.max_conversations,
        )),
        StoreBackend::Sqlite => Arc::new(
            SqliteConversationStore::open(&store.sqlite_path, store.ttl(), store.max_conversations)
                .await
                .context("Failed to open conversation store")?,
        ),
    })
}

async fn build_replication(config: &AppConfig) -> Result<ReplicationLayer> {
    let replication = &config.replication;
    let contexts = match &replication.redis_url {
        Some(url) => ContextReplicator::redis(url, replication.context_ttl())
            .context("Invalid replication.redis_url")?,
        None => ContextReplicator::local_only(replication.context_ttl()),
    };
    let history: Arc<dyn TurnHistory> = match replication.history_backend {
        HistoryBackend::Sqlite => Arc::new(
            SqliteTurnHistory::open(&replication.history_path)
                .await
                .context("Failed to open turn history")?,
        ),
        HistoryBackend::Memory => Arc::new(MemoryTurnHistory::new(
            replication.context_ttl(),
            config.store.max_conversations,
        )),
    };
    Ok(ReplicationLayer::new(contexts, history))
}

/// Wire the full pipeline
pub async fn build_state(config: &AppConfig) -> Result<ApiState> {
    let tools = build_tools(config)?;
    let agents = build_agents(&tools)?;
    let (provider, llm_configured) = build_provider(&config.llm);

    let capability = LlmAgentCapability::new(provider.clone(), tools, agents.clone())
        .with_model(&config.llm.model)
        .with_sampling(config.llm.temperature, config.llm.max_tokens)
        .with_max_tool_iterations(config.runner.max_tool_iterations);

    let judge = LlmJudge::new(provider, &config.llm.guardrail_model).with_settings(
        config.llm.guardrail_temperature,
        config.llm.guardrail_max_tokens,
    );
    let guardrails = GuardrailEvaluator::new(
        Arc::new(judge),
        Arc::new(GuardrailCache::new(
            config.guardrails.cache_size,
            config.guardrails.cache_ttl(),
        )),
        config.guardrails.judge_timeout(),
    );

    let store = build_store(config).await?;
    let replication = build_replication(config).await?;
    info!(
        store = store.backend(),
        shared_context = replication.contexts().is_shared(),
        "Conversation state configured"
    );

    let runner = Runner::new(agents, Arc::new(capability), Arc::new(guardrails), store)
        .with_config(config.runner.clone())
        .with_output_policy(
            config.guardrails.output_policy,
            config.guardrails.withheld_message.clone(),
        )
        .with_replication(Arc::new(replication));

    Ok(ApiState {
        runner,
        environment: config.server.environment.clone(),
        llm_configured,
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the server
pub async fn run(config: AppConfig) -> Result<()> {
    let state = Arc::new(build_state(&config).await?);
    info!(
        agents = state.runner.agents().len(),
        environment = %state.environment,
        "Agent pipeline ready"
    );

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
