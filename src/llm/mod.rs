//! Language model client abstraction.
//!
//! `LlmClient` is the seam the dispatcher calls through; `AnthropicClient`
//! is the production implementation.

mod anthropic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use anthropic::AnthropicClient;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back with the result
    pub id: String,

    /// Registered tool name
    pub name: String,

    /// JSON object of arguments
    pub arguments: Value,
}

/// One entry of the conversation sent to the model.
///
/// On assistant messages `tool_call` is the request; on tool messages it
/// names the call the content answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: None,
        }
    }

    pub fn assistant_tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: Some(call),
        }
    }

    pub fn tool_result(call: ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call: Some(call),
        }
    }
}

/// Tool description advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Normalised model reply.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Concatenated text blocks, if any
    pub content: Option<String>,

    /// Tool calls in the order the model requested them
    pub tool_calls: Vec<ToolCall>,

    pub stop_reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request to model provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from model provider: {0}")]
    InvalidResponse(String),
}

/// Chat completion client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `messages` with the given system instruction and optional tools.
    async fn chat_completion(
        &self,
        model: &str,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, LlmError>;
}
