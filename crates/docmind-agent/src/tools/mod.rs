//! Agent tool trait and registry.
//!
//! Each tool declares a JSON schema for its arguments and executes with a
//! borrowed [`AgentRequestContext`]. Arguments are deserialized into typed
//! structs; unknown or missing fields are rejected before execution.

pub mod mindmap;
pub mod search;
pub mod summary;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::AgentRequestContext;
use crate::error::AgentError;
use crate::llm::ToolDefinition;

pub use mindmap::{MindmapGeneratorTool, MindmapLimits, MindmapNode};
pub use search::DocumentsSearchTool;
pub use summary::DocumentsSummaryTool;

#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &AgentRequestContext<'_>,
    ) -> Result<Value, AgentError>;
}

/// Deserialize tool arguments, reporting failures against the tool name.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, AgentError> {
    serde_json::from_value(arguments).map_err(|e| AgentError::invalid_arguments(tool, e.to_string()))
}

/// Tools available to the agent, looked up by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn AgentTool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with(mut self, tool: impl AgentTool + 'static) -> Self {
        self.register(Box::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn AgentTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl AgentTool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo the arguments"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(
            &self,
            arguments: Value,
            _ctx: &AgentRequestContext<'_>,
        ) -> Result<Value, AgentError> {
            Ok(arguments)
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct QueryOnly {
        query: String,
    }

    #[test]
    fn test_registry_lookup_and_definitions() {
        let registry = ToolRegistry::new().with(EchoTool);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());

        let defs = registry.definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].description, "Echo the arguments");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new().with(EchoTool);
        registry.register(Box::new(EchoTool));
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_parse_arguments_rejects_unknown_and_missing_fields() {
        let ok: QueryOnly = parse_arguments("t", json!({"query": "q"})).unwrap();
        assert_eq!(ok.query, "q");

        let err = parse_arguments::<QueryOnly>("t", json!({"query": "q", "ownerId": "u2"}))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArguments { .. }));

        let err = parse_arguments::<QueryOnly>("t", json!({})).unwrap_err();
        assert!(err.to_string().contains("query"));
    }
}
