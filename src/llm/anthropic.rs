//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatMessage, ChatResponse, LlmClient, LlmError, Role, ToolCall, ToolSchema};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Client for `POST /v1/messages`.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat_completion(
        &self,
        model: &str,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = build_request_body(model, system, messages, tools, self.max_tokens);

        tracing::debug!(model, messages = messages.len(), "Sending messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(parsed.into())
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

impl From<MessagesResponse> for ChatResponse {
    fn from(value: MessagesResponse) -> Self {
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in value.content {
            match block {
                ResponseBlock::Text { text } => texts.push(text),
                ResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ResponseBlock::Unknown => {}
            }
        }

        let content = texts.join("\n");
        Self {
            content: (!content.trim().is_empty()).then_some(content),
            tool_calls,
            stop_reason: value.stop_reason,
        }
    }
}

/// Build the request payload. Tool results travel as `tool_result` blocks in
/// user turns and adjacent turns with the same API role are merged, since the
/// API expects user and assistant turns to alternate.
fn build_request_body(
    model: &str,
    system: &str,
    messages: &[ChatMessage],
    tools: Option<&[ToolSchema]>,
    max_tokens: u32,
) -> Value {
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for message in messages {
        let (role, blocks) = message_blocks(message);
        if blocks.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => turns.push((role, blocks)),
        }
    }

    let messages: Vec<Value> = turns
        .into_iter()
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect();

    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": 0,
        "system": system,
        "messages": messages,
    });

    if let Some(tools) = tools.filter(|t| !t.is_empty()) {
        body["tools"] = json!(tools);
    }

    body
}

fn message_blocks(message: &ChatMessage) -> (&'static str, Vec<Value>) {
    let mut blocks = Vec::new();
    match message.role {
        Role::User => {
            if !message.content.is_empty() {
                blocks.push(json!({ "type": "text", "text": message.content }));
            }
            ("user", blocks)
        }
        Role::Assistant => {
            if !message.content.trim().is_empty() {
                blocks.push(json!({ "type": "text", "text": message.content }));
            }
            if let Some(call) = &message.tool_call {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": call.id,
                    "name": call.name,
                    "input": call.arguments,
                }));
            }
            ("assistant", blocks)
        }
        Role::Tool => {
            match &message.tool_call {
                Some(call) => blocks.push(json!({
                    "type": "tool_result",
                    "tool_use_id": call.id,
                    "content": message.content,
                })),
                None => blocks.push(json!({ "type": "text", "text": message.content })),
            }
            ("user", blocks)
        }
    }
}
