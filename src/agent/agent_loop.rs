//! Core agent loop implementation.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::llm::{AnthropicClient, ChatMessage};
use crate::tools::ToolRegistry;

use super::dispatcher::{DispatchDecision, DispatchError, Dispatcher, LlmDispatcher};
use super::transcript::Transcript;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Max iterations ({0}) reached without a final answer")]
    IterationLimit(usize),
}

/// Runs one query-response cycle at a time.
pub struct Agent {
    dispatcher: Arc<dyn Dispatcher>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        tools: Arc<ToolRegistry>,
        max_iterations: usize,
    ) -> Self {
        Self {
            dispatcher,
            tools,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Production agent: Anthropic-backed dispatcher plus both scraping tools.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let tools = Arc::new(ToolRegistry::from_config(config)?);
        let llm = Arc::new(AnthropicClient::new(
            config.api_key.clone(),
            config.llm_base_url.clone(),
        )?);
        let dispatcher = Arc::new(LlmDispatcher::new(llm, config.default_model.clone(), &tools));

        Ok(Self::new(dispatcher, tools, config.max_iterations))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle a query and return the full transcript.
    ///
    /// Each tool call adds the assistant's request followed by exactly one tool
    /// message, whether or not the tool succeeded.
    pub async fn run_query(&self, query: &str) -> Result<Transcript, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let mut transcript = Transcript::seed(query);
        tracing::info!(transcript = %transcript.id(), "Handling query");

        for iteration in 0..self.max_iterations {
            tracing::debug!("Agent iteration {}", iteration + 1);

            match self.dispatcher.decide(&transcript).await? {
                DispatchDecision::Terminal(answer) => {
                    transcript.push(ChatMessage::assistant(answer));
                    tracing::info!(
                        transcript = %transcript.id(),
                        messages = transcript.len(),
                        "Query answered"
                    );
                    return Ok(transcript);
                }
                DispatchDecision::Invoke { mut content, calls } => {
                    for call in calls {
                        tracing::info!(
                            "Calling tool: {} with args: {}",
                            call.name,
                            call.arguments
                        );
                        transcript.push(ChatMessage::assistant_tool_call(
                            std::mem::take(&mut content),
                            call.clone(),
                        ));

                        let result = self.tools.invoke(&call.name, call.arguments.clone()).await;
                        tracing::debug!(
                            tool = %call.name,
                            "Tool result: {}",
                            truncate_for_log(&result, 1000)
                        );
                        transcript.push(ChatMessage::tool_result(call, result));
                    }
                }
            }
        }

        tracing::warn!(transcript = %transcript.id(), "Iteration limit reached");
        Err(SessionError::IterationLimit(self.max_iterations))
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
