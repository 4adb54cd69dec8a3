//! Per-query message history.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::llm::{ChatMessage, Role};

/// Ordered, append-only history of one query-response cycle.
///
/// Always starts with the user's query, so it is never empty.
#[derive(Debug, Clone)]
pub struct Transcript {
    id: Uuid,
    started_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Start a transcript from the user's query.
    pub fn seed(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: vec![ChatMessage::user(query)],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The closing assistant answer, if the cycle reached one.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant && m.tool_call.is_none())
            .map(|m| m.content.as_str())
    }

    /// Number of tool result messages.
    pub fn tool_results(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::Tool).count()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}
