//! Tool system for the agent.
//!
//! Every tool implements [`Tool`]; [`ToolRegistry::invoke`] is the boundary the
//! session loop calls and it always produces text, whatever the tool did.

pub mod browser;
pub mod catalog;
pub mod pdf;
pub mod spec_sheet;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::llm::ToolSchema;

pub use browser::{BrowserError, BrowserLauncher, BrowserSession, SessionGuard, WebDriverLauncher};
pub use catalog::{CatalogSearch, Product, CATALOG_SEARCH};
pub use spec_sheet::{slugify, SpecSheetFetch, SPEC_SHEET};

/// Failure reported by a tool body. The `Display` text is what the model sees.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments missing or malformed; no I/O was attempted.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and failed; the message is already user-facing.
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
#[error("Tool already registered: {0}")]
pub struct DuplicateTool(pub String);

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String, ToolError>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Ordered set of tools with unique names.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the catalog search and spec sheet tools wired from config.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let launcher = Arc::new(WebDriverLauncher::new(
            config.catalog.webdriver_url.clone(),
            config.catalog.browser_name.clone(),
        ));

        let mut registry = Self::new();
        registry.tools.push(Arc::new(CatalogSearch::new(launcher, &config.catalog)));
        registry.tools.push(Arc::new(SpecSheetFetch::new(&config.spec_sheet)?));
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), DuplicateTool> {
        if self.get(tool.name()).is_some() {
            return Err(DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Schemas advertised to the model.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect()
    }

    /// Run a tool and return its output as text.
    ///
    /// Unknown names, tool errors and panics are all reported as text.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        let Some(tool) = self.get(name) else {
            let available = self
                .tools
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(tool = name, "Model requested an unknown tool");
            return format!("Error: unknown tool '{}'. Available tools: {}", name, available);
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(args)).catch_unwind().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                tracing::info!(tool = name, elapsed_ms, "Tool completed");
                output
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = name, elapsed_ms, error = %e, "Tool failed");
                e.to_string()
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(tool = name, elapsed_ms, "Tool panicked: {}", reason);
                format!("An unexpected error occurred: {}", reason)
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

/// Non-empty trimmed string argument, trying each key in order.
pub(crate) fn string_arg<'a>(args: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| args.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase the text argument"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }

        async fn execute(&self, args: Value) -> Result<String, ToolError> {
            match args["text"].as_str() {
                Some("boom") => panic!("kaboom"),
                Some(text) => Ok(text.to_uppercase()),
                None => Err(ToolError::InvalidArguments("Missing 'text' argument".to_string())),
            }
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Upper)).unwrap();
        registry
    }

    #[tokio::test]
    async fn invoke_returns_output() {
        assert_eq!(registry().invoke("upper", json!({ "text": "abc" })).await, "ABC");
    }

    #[tokio::test]
    async fn invoke_renders_errors_as_text() {
        let out = registry().invoke("upper", json!({})).await;
        assert_eq!(out, "Invalid arguments: Missing 'text' argument");
    }

    #[tokio::test]
    async fn invoke_survives_panics() {
        let out = registry().invoke("upper", json!({ "text": "boom" })).await;
        assert!(out.starts_with("An unexpected error occurred"));
        assert!(out.contains("kaboom"));
    }

    #[tokio::test]
    async fn unknown_tool_lists_available_tools() {
        let out = registry().invoke("nope", json!({})).await;
        assert!(out.contains("unknown tool 'nope'"));
        assert!(out.contains("upper"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let err = registry.register(Arc::new(Upper)).unwrap_err();
        assert_eq!(err.0, "upper");
        assert_eq!(registry.list_tools().len(), 1);
    }

    #[test]
    fn schemas_carry_parameters() {
        let schemas = registry().schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].input_schema["type"], "object");
    }

    #[test]
    fn string_arg_skips_blank_values() {
        let args = json!({ "name": "  ", "vehicle_name": " Hunter " });
        assert_eq!(string_arg(&args, &["name", "vehicle_name"]), Some("Hunter"));
        assert_eq!(string_arg(&json!({}), &["name"]), None);
    }
}
