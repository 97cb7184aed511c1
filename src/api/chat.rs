//! Chat endpoint

use super::ApiState;
use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use erni_core::{TurnRequest, TurnResponse};
use serde::Serialize;
use std::sync::Arc;

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Turn failure mapped to an HTTP response
///
/// Only the public message leaves the process; details were logged by the runner.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<erni_core::Error> for ApiError {
    fn from(err: erni_core::Error) -> Self {
        let status = match &err {
            erni_core::Error::Validation(_) => StatusCode::BAD_REQUEST,
            erni_core::Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.public_message(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("invalid request body: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Run one conversational turn
async fn chat(
    Extension(state): Extension<Arc<ApiState>>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.runner.run_turn(request).await?;
    Ok(Json(response))
}

/// Create chat routes
pub fn chat_routes() -> Router {
    Router::new().route("/chat", post(chat))
}
