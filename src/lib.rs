//! # Product Agent
//!
//! A conversational agent that answers product questions with live data.
//!
//! This library provides:
//! - An HTTP API for submitting queries and reading back the transcript
//! - A tool-dispatch loop driven by a language model
//! - A catalog search tool (browser-automated scraping of search results)
//! - A spec sheet tool (floor-plan PDF text for a named vehicle)
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a query via the API
//! 2. Seed a fresh transcript with it
//! 3. Ask the dispatcher to answer or call a tool; run requested tools
//! 4. Feed results back to the dispatcher, repeat until it answers
//!
//! ## Example
//!
//! ```rust,ignore
//! use product_agent::{agent::Agent, config::Config};
//!
//! let config = Config::load()?;
//! let agent = Agent::from_config(&config)?;
//! let transcript = agent.run_query("Top 3 results for 2 compartment sinks").await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
