//! HTTP routes for submitting queries.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;

use super::types::{ErrorResponse, HealthResponse, QueryRequest, QueryResponse};
use crate::agent::{Agent, SessionError};

/// Shared server state.
pub struct AppState {
    agent: Agent,
    /// Held for the whole of a query so only one is processed at a time.
    busy: Mutex<()>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            busy: Mutex::new(()),
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/query", post(submit_query))
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/query - Run one query-response cycle and return its transcript.
pub async fn submit_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.query.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Query cannot be empty".to_string()));
    }

    let _busy = state.busy.lock().await;
    tracing::info!("Processing user input: {}", request.query);

    match state.agent.run_query(&request.query).await {
        Ok(transcript) => Ok(Json(QueryResponse::from(transcript))),
        Err(SessionError::EmptyQuery) => Err(error(
            StatusCode::BAD_REQUEST,
            SessionError::EmptyQuery.to_string(),
        )),
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            Err(error(StatusCode::BAD_GATEWAY, format!("An error occurred: {}", e)))
        }
    }
}

fn error(status: StatusCode, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error: message }))
}
