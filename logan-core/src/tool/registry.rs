//! Tool registry for managing available tools.

use super::{Tool, ToolError, ToolSchema};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available tools, keyed by name.
///
/// Tools are stored as `Arc<dyn Tool>`, so a registry can be shared by
/// several agent runs.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool in the registry.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    /// Register a tool that's already wrapped in Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted alphabetically.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas for every registered tool, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.to_schema())
            .collect()
    }

    /// Execute a tool by name and render the outcome as message text.
    ///
    /// Never fails: unknown tools, bad arguments and execution errors all
    /// come back as an `Error: ...` string for the model to read.
    pub async fn execute_to_string(&self, name: &str, arguments: Value) -> String {
        let Some(tool) = self.get(name) else {
            log::warn!("Model requested unknown tool '{}'", name);
            return format!("Error: {}", ToolError::UnknownTool(name.to_string()));
        };

        if !arguments.is_object() {
            log::warn!("Tool '{}' called with non-object arguments", name);
            return format!(
                "Error: {}",
                ToolError::InvalidInput(format!(
                    "arguments for '{}' must be a JSON object, got: {}",
                    name, arguments
                ))
            );
        }

        match tool.execute(arguments).await {
            Ok(result) => {
                log::debug!("Tool '{}' returned {} chars", name, result.content.len());
                result.content
            }
            Err(e) => {
                log::debug!("Tool '{}' failed: {}", name, e);
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResult;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug)]
    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Uppercases text"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
            let text = input
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidInput("Missing 'text' field".into()))?;
            Ok(ToolResult::new(text.to_uppercase()))
        }
    }

    #[derive(Debug)]
    struct Other;

    #[async_trait]
    impl Tool for Other {
        fn name(&self) -> &str {
            "another"
        }
        fn description(&self) -> &str {
            "Another tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _input: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::new("ok"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Upper).register(Other);
        registry
    }

    #[test]
    fn test_register_and_list_sorted() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec!["another", "upper"]);
        assert!(registry.get("upper").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_schemas_sorted_by_name() {
        let names: Vec<String> = registry().schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["another", "upper"]);
    }

    #[tokio::test]
    async fn test_execute_to_string_success() {
        let out = registry()
            .execute_to_string("upper", json!({"text": "disk full"}))
            .await;
        assert_eq!(out, "DISK FULL");
    }

    #[tokio::test]
    async fn test_execute_to_string_unknown_tool() {
        let out = registry().execute_to_string("rm", json!({})).await;
        assert_eq!(out, "Error: Unknown tool: rm");
    }

    #[tokio::test]
    async fn test_execute_to_string_non_object_arguments() {
        let out = registry()
            .execute_to_string("upper", Value::String("{not json".into()))
            .await;
        assert!(out.starts_with("Error: Invalid input"), "got: {}", out);
    }

    #[tokio::test]
    async fn test_execute_to_string_tool_error() {
        let out = registry().execute_to_string("upper", json!({})).await;
        assert_eq!(out, "Error: Invalid input: Missing 'text' field");
    }
}
