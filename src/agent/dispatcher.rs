//! Decides, for the current transcript, whether to answer or call a tool.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::prompt::build_system_prompt;
use super::transcript::Transcript;
use crate::llm::{ChatResponse, LlmClient, LlmError, ToolCall, ToolSchema};
use crate::tools::ToolRegistry;

/// Outcome of one dispatcher step.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchDecision {
    /// Answer the user; ends the cycle.
    Terminal(String),

    /// Run these tools in order, then decide again. `content` is any text the
    /// model sent alongside the request.
    Invoke { content: String, calls: Vec<ToolCall> },
}

impl DispatchDecision {
    /// Normalise a model reply. Tool calls win over text.
    pub fn from_response(response: ChatResponse) -> Result<Self, DispatchError> {
        if !response.tool_calls.is_empty() {
            return Ok(DispatchDecision::Invoke {
                content: response.content.unwrap_or_default(),
                calls: response.tool_calls,
            });
        }
        match response.content {
            Some(text) => Ok(DispatchDecision::Terminal(text)),
            None => Err(DispatchError::EmptyResponse),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Model returned neither text nor a tool call")]
    EmptyResponse,

    #[error("Dispatcher script exhausted")]
    ScriptExhausted,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn decide(&self, transcript: &Transcript) -> Result<DispatchDecision, DispatchError>;
}

/// Dispatcher backed by a language model.
pub struct LlmDispatcher {
    llm: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
    tools: Vec<ToolSchema>,
}

impl LlmDispatcher {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, tools: &ToolRegistry) -> Self {
        Self {
            llm,
            model: model.into(),
            system_prompt: build_system_prompt(tools),
            tools: tools.schemas(),
        }
    }
}

#[async_trait]
impl Dispatcher for LlmDispatcher {
    async fn decide(&self, transcript: &Transcript) -> Result<DispatchDecision, DispatchError> {
        let response = self
            .llm
            .chat_completion(
                &self.model,
                &self.system_prompt,
                transcript.messages(),
                Some(self.tools.as_slice()),
            )
            .await?;

        tracing::debug!(
            stop_reason = response.stop_reason.as_deref().unwrap_or("none"),
            tool_calls = response.tool_calls.len(),
            "Model responded"
        );

        DispatchDecision::from_response(response)
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedDispatcher;

#[cfg(any(test, feature = "test-util"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{DispatchDecision, DispatchError, Dispatcher, Transcript};

    /// Deterministic dispatcher that replays scripted decisions.
    ///
    /// With `repeat_last`, the final decision is returned forever instead of
    /// failing with `ScriptExhausted`.
    pub struct ScriptedDispatcher {
        script: Mutex<VecDeque<DispatchDecision>>,
        repeat_last: bool,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedDispatcher {
        pub fn new(script: Vec<DispatchDecision>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                repeat_last: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Always return `decision`.
        pub fn repeating(decision: DispatchDecision) -> Self {
            Self {
                script: Mutex::new(VecDeque::from([decision])),
                repeat_last: true,
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Transcript lengths observed at each `decide` call.
        pub fn seen_lengths(&self) -> Vec<usize> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn decide(&self, transcript: &Transcript) -> Result<DispatchDecision, DispatchError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(transcript.len());
            }

            let mut script = self
                .script
                .lock()
                .map_err(|_| DispatchError::ScriptExhausted)?;
            let decision = if self.repeat_last && script.len() == 1 {
                script.front().cloned()
            } else {
                script.pop_front()
            };
            decision.ok_or(DispatchError::ScriptExhausted)
        }
    }
}
