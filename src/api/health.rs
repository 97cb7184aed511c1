//! Health check endpoints
//!
//! Provides:
//! - `/health`: liveness with version and environment (for load balancers)
//! - `/readiness`: LLM key, environment and Redis checks; 503 when any fails

use super::ApiState;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

const SERVICE_NAME: &str = "ERNI Building Agents API";

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub environment: String,
    pub service: &'static str,
}

/// Readiness response with per-check results
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub openai_api: bool,
    pub environment_configured: bool,
    /// `None` when no Redis is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<bool>,
}

impl ReadinessChecks {
    fn ready(&self) -> bool {
        self.openai_api && self.environment_configured && self.redis.unwrap_or(true)
    }
}

async fn health_check(Extension(state): Extension<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.clone(),
        service: SERVICE_NAME,
    })
}

async fn readiness_check(Extension(state): Extension<Arc<ApiState>>) -> impl IntoResponse {
    let redis = match state.runner.replication() {
        Some(replication) => replication.contexts().ping().await,
        None => None,
    };
    let checks = ReadinessChecks {
        openai_api: state.llm_configured,
        environment_configured: !state.environment.trim().is_empty(),
        redis,
    };

    let (status, label) = if checks.ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };
    (
        status,
        Json(ReadinessResponse {
            status: label,
            checks,
        }),
    )
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/readiness", get(readiness_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{api_router, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(state: ApiState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = api_router(Arc::new(state))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(test_support::default_state(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_readiness_without_redis() {
        let (status, body) = get_json(test_support::default_state(), "/readiness").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert!(body["checks"].get("redis").is_none());
    }

    #[tokio::test]
    async fn test_readiness_without_api_key() {
        let mut state = test_support::default_state();
        state.llm_configured = false;
        let (status, body) = get_json(state, "/readiness").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["checks"]["openai_api"], false);
    }

    #[test]
    fn test_unreachable_redis_is_not_ready() {
        let checks = ReadinessChecks {
            openai_api: true,
            environment_configured: true,
            redis: Some(false),
        };
        assert!(!checks.ready());
    }
}
