//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Transcript;
use crate::llm::ChatMessage;

/// Request to answer a query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// The user's free-text question
    pub query: String,
}

/// The transcript of one answered query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    /// Transcript identifier
    pub id: Uuid,

    /// When handling started
    pub started_at: DateTime<Utc>,

    /// Final assistant answer
    pub answer: Option<String>,

    /// Every message exchanged, in order
    pub messages: Vec<ChatMessage>,
}

impl From<Transcript> for QueryResponse {
    fn from(transcript: Transcript) -> Self {
        Self {
            id: transcript.id(),
            started_at: transcript.started_at(),
            answer: transcript.final_answer().map(str::to_string),
            messages: transcript.into_messages(),
        }
    }
}

/// Error body returned for failed queries.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
