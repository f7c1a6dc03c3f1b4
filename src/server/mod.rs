//! HTTP interface over a loaded [`ServingContext`].
//!
//! `POST /api/ask` answers a question, `GET /health` reports whether the index
//! is loaded. Embedding and search are blocking, so each request runs them on
//! the blocking thread pool.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::answer::Answer;
use crate::retrieval::ServingContext;
use crate::{RagError, Result};

pub const MISSING_QUESTION: &str = "Missing 'question' in JSON";

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub context: Arc<ServingContext>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub units: usize,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Request failures, each mapped to one status code
#[derive(Debug)]
pub enum ApiError {
    BadRequest,
    NotReady(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest => (StatusCode::BAD_REQUEST, MISSING_QUESTION.to_string()),
            Self::NotReady(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Service not ready: {}", reason),
            ),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<RagError> for ApiError {
    #[inline]
    fn from(error: RagError) -> Self {
        match error {
            RagError::NotReady(reason) => Self::NotReady(reason),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Build the router with request tracing.
#[inline]
pub fn router(context: Arc<ServingContext>) -> Router {
    let state = Arc::new(AppState { context });

    Router::new()
        .route("/api/ask", post(ask))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `address` and serve until Ctrl+C.
#[inline]
pub async fn serve(context: Arc<ServingContext>, address: &str) -> Result<()> {
    if !context.is_ready() {
        warn!(
            "Serving without an index, every question will be rejected: {}",
            context.not_ready_reason().unwrap_or("unknown reason")
        );
    }

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(context))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn ask(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> std::result::Result<Json<Answer>, ApiError> {
    let question = match body {
        Ok(Json(request)) if !request.question.trim().is_empty() => request.question,
        Ok(_) => return Err(ApiError::BadRequest),
        Err(rejection) => {
            warn!("Rejected ask request: {}", rejection.body_text());
            return Err(ApiError::BadRequest);
        }
    };

    if let Some(reason) = state.context.not_ready_reason() {
        return Err(ApiError::NotReady(reason.to_string()));
    }

    let context = Arc::clone(&state.context);
    let answer = tokio::task::spawn_blocking(move || context.ask(&question))
        .await
        .map_err(|e| ApiError::Internal(format!("Request task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to answer question: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(answer))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let context = &state.context;
    Json(HealthResponse {
        status: if context.is_ready() { "ok" } else { "not_ready" },
        units: context.unit_count(),
        model: context.model_id().to_string(),
    })
}
