//! Tool registry.
//!
//! Tools are the functions the model may call during a run. Each tool
//! advertises a [`ToolSpec`] (name, description, JSON schema for its
//! arguments) and handles calls by returning plain text, which becomes the
//! content of a tool-result turn.

use crate::error::ToolError;
use crate::turn::ToolCallRequest;
use async_trait::async_trait;
use rootcause::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Definition of a tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: JsonValue,
}

impl ToolSpec {
    /// Creates a new tool spec with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the argument schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: JsonValue) -> Self {
        self.parameters = schema;
        self
    }
}

/// A callable tool.
///
/// Implementations report data problems (bad symbol, provider outage) as
/// text in the `Ok` value so the model can react to them. `Err` is reserved
/// for calls that cannot be executed at all, such as malformed arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool spec.
    fn spec(&self) -> &ToolSpec;

    /// Executes the tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not match the tool's schema.
    async fn call(&self, arguments: &JsonValue) -> Result<String, ToolError>;
}

/// Decodes tool arguments into a typed struct.
///
/// # Errors
///
/// Returns [`ToolError::InvalidInput`] if the arguments do not deserialize.
pub fn parse_arguments<T: DeserializeOwned>(
    tool_name: &str,
    arguments: &JsonValue,
) -> Result<T, ToolError> {
    T::deserialize(arguments).map_err(|e| ToolError::InvalidInput {
        name: tool_name.to_string(),
        reason: e.to_string(),
    })
}

/// Registry of available tools, in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns an error if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), Report<ToolError>> {
        let name = tool.spec().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::Duplicate { name }.into());
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }

    /// Returns the registered tool names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.spec().name.as_str())
    }

    /// Returns the specs of all registered tools in registration order.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec().clone()).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Executes a tool call against the matching registered tool.
    ///
    /// # Errors
    ///
    /// Returns an error if no tool has the requested name or the tool rejects
    /// the arguments.
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<String, Report<ToolError>> {
        let tool = self.get(&call.name).ok_or_else(|| ToolError::NotFound {
            name: call.name.clone(),
        })?;
        Ok(tool.call(&call.arguments).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo {
        spec: ToolSpec,
    }

    impl Echo {
        fn new(name: &str) -> Self {
            Self {
                spec: ToolSpec::new(name, "Echo the text argument").with_parameters(json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                })),
            }
        }
    }

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[async_trait]
    impl Tool for Echo {
        fn spec(&self) -> &ToolSpec {
            &self.spec
        }

        async fn call(&self, arguments: &JsonValue) -> Result<String, ToolError> {
            let args: EchoArgs = parse_arguments(&self.spec.name, arguments)?;
            Ok(args.text)
        }
    }

    #[test]
    fn registry_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo::new("zeta"))).expect("zeta");
        registry.register(Arc::new(Echo::new("alpha"))).expect("alpha");

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(registry.specs()[1].name, "alpha");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo::new("echo"))).expect("first");
        let err = registry
            .register(Arc::new(Echo::new("echo")))
            .expect_err("duplicate");
        assert_eq!(
            err.current_context(),
            &ToolError::Duplicate {
                name: "echo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn execute_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo::new("echo"))).expect("register");

        let call = ToolCallRequest::new("call_1", "echo", json!({"text": "hello"}));
        let output = registry.execute(&call).await.expect("execute");
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn execute_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let call = ToolCallRequest::new("call_1", "missing", json!({}));
        let err = registry.execute(&call).await.expect_err("unknown tool");
        assert_eq!(
            err.current_context(),
            &ToolError::NotFound {
                name: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn execute_rejects_malformed_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo::new("echo"))).expect("register");

        let call = ToolCallRequest::new("call_1", "echo", json!({"txt": 1}));
        let err = registry.execute(&call).await.expect_err("bad args");
        assert!(matches!(
            err.current_context(),
            ToolError::InvalidInput { .. }
        ));
    }
}
