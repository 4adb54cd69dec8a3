//! Agent module - the tool-dispatch loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the transcript with the user's query
//! 2. Ask the dispatcher whether to answer or call a tool
//! 3. If a tool is requested, run it and append its result
//! 4. Repeat until the dispatcher answers or max iterations is reached

mod agent_loop;
mod dispatcher;
mod prompt;
mod transcript;

pub use agent_loop::{Agent, SessionError};
pub use dispatcher::{DispatchDecision, DispatchError, Dispatcher, LlmDispatcher};
#[cfg(any(test, feature = "test-util"))]
pub use dispatcher::ScriptedDispatcher;
pub use prompt::build_system_prompt;
pub use transcript::Transcript;
