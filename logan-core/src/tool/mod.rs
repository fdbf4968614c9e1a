//! Tool abstraction for agent actions.
//!
//! This module provides the [`Tool`] trait and [`ToolRegistry`] used by the
//! log agent. Tools are stateless instances; the agent only sees their
//! [`ToolSchema`] and the string their execution produces.
//!
//! # Example
//!
//! ```no_run
//! use logan_core::tool::{Tool, ToolResult, ToolError, ToolRegistry};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     fn name(&self) -> &str { "echo" }
//!     fn description(&self) -> &str { "Repeats its input" }
//!     fn parameters_schema(&self) -> Value {
//!         json!({
//!             "type": "object",
//!             "properties": { "text": { "type": "string" } },
//!             "required": ["text"]
//!         })
//!     }
//!     async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
//!         let text = input["text"].as_str().unwrap_or("");
//!         Ok(ToolResult::new(text))
//!     }
//! }
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Echo);
//! assert!(registry.contains("echo"));
//! ```

mod registry;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result returned by a tool execution.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ToolResult {
    /// The text handed back to the model.
    pub content: String,
    /// Optional structured metadata for logging.
    pub metadata: Value,
}

impl ToolResult {
    /// Create a result with just content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Value::Null,
        }
    }

    /// Create a result with content and metadata.
    pub fn with_metadata(content: impl Into<String>, metadata: Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Errors that can occur during tool execution.
///
/// None of these abort an agent run: the registry renders them into the
/// tool message so the model can react.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Arguments missing, mistyped, or not a JSON object.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request tried to leave the tool's sandbox.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// No tool with this name is registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// Name, description and JSON schema advertised to the model for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool that agents can invoke to perform actions.
///
/// Each tool has a unique name, description, and parameter schema that the
/// model uses to decide when and how to invoke it.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    /// Unique identifier for this tool (e.g., "read_log_file").
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given input.
    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError>;

    /// Build the schema advertised to the model.
    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Noop;

    #[async_trait]
    impl Tool for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn description(&self) -> &str {
            "Does nothing"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _input: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::new(""))
        }
    }

    #[test]
    fn test_tool_result_with_metadata() {
        let result = ToolResult::with_metadata("hello", json!({"lines": 3}));
        assert_eq!(result.content, "hello");
        assert_eq!(result.metadata["lines"], 3);
    }

    #[test]
    fn test_tool_error_display() {
        assert_eq!(
            ToolError::InvalidInput("bad".into()).to_string(),
            "Invalid input: bad"
        );
        assert_eq!(
            ToolError::NotFound("app.log".into()).to_string(),
            "Not found: app.log"
        );
        assert_eq!(
            ToolError::UnknownTool("rm".into()).to_string(),
            "Unknown tool: rm"
        );
    }

    #[test]
    fn test_to_schema() {
        let schema = Noop.to_schema();
        assert_eq!(schema.name, "noop");
        assert_eq!(schema.description, "Does nothing");
        assert_eq!(schema.parameters["type"], "object");
    }
}
