//! Agent graph endpoint

use super::ApiState;
use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use erni_core::AgentSummary;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct AgentsResponse {
    pub routing_agent: String,
    pub agents: Vec<AgentSummary>,
}

async fn list_agents(Extension(state): Extension<Arc<ApiState>>) -> Json<AgentsResponse> {
    let agents = state.runner.agents();
    Json(AgentsResponse {
        routing_agent: agents.routing_name().to_string(),
        agents: agents.summaries(),
    })
}

/// Create agent graph routes
pub fn agents_routes() -> Router {
    Router::new().route("/agents", get(list_agents))
}
