//! Tool registry: name → tool, shared by the chat model (schemas) and the
//! graph's tools node (execution).

use docagent_core::error::{OrchestrationError, Result};
use docagent_core::traits::Tool;
use docagent_core::types::{ToolCall, ToolDefinition, ToolResult};
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct ToolRegistry {
    /// Registration order is the order advertised to the model.
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve and run one tool call. Unknown names and missing required
    /// arguments are orchestration errors; the result carries the call id.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let name = call.function.name.as_str();
        let tool = self
            .get(name)
            .ok_or_else(|| OrchestrationError::UnknownTool(name.to_string()))?;

        // Bare (non-object) arguments are left to the tool to interpret.
        if let Ok(args @ serde_json::Value::Object(_)) =
            serde_json::from_str::<serde_json::Value>(&call.function.arguments)
        {
            validate_args(&tool.definition(), &args).map_err(|reason| {
                OrchestrationError::InvalidToolArguments {
                    tool: name.to_string(),
                    reason,
                }
            })?;
        }

        tracing::info!("🔧 Tool call: {name}({})", call.function.arguments);
        let mut result = tool.execute(&call.function.arguments).await?;
        result.tool_call_id = call.id.clone();
        Ok(result)
    }
}

/// Validate that a tool call has the required arguments.
pub fn validate_args(definition: &ToolDefinition, args: &serde_json::Value) -> std::result::Result<(), String> {
    let params = &definition.parameters;
    if let Some(required) = params.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|r| r.as_str()) {
            if args.get(key).is_none() {
                return Err(format!("Missing required argument: {key}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docagent_core::error::DocAgentError;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echo the query".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "user_query": { "type": "string" } },
                    "required": ["user_query"]
                }),
            }
        }

        async fn execute(&self, arguments: &str) -> Result<ToolResult> {
            Ok(ToolResult {
                tool_call_id: String::new(),
                output: arguments.to_string(),
                success: true,
            })
        }
    }

    #[test]
    fn test_validate_args_missing() {
        let def = EchoTool.definition();
        assert!(validate_args(&def, &serde_json::json!({})).is_err());
        assert!(validate_args(&def, &serde_json::json!({"user_query": "q"})).is_ok());
    }

    #[test]
    fn test_validate_args_no_required() {
        let def = ToolDefinition {
            name: "test".into(),
            description: "test tool".into(),
            parameters: serde_json::json!({}),
        };
        assert!(validate_args(&def, &serde_json::json!({})).is_ok());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(EchoTool))
            .with_tool(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_execute_sets_call_id() {
        let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));
        let call = ToolCall::new("call_7", "echo", r#"{"user_query":"hi"}"#);
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result.tool_call_id, "call_7");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));
        let err = registry
            .execute(&ToolCall::new("c1", "web_search", "{}"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocAgentError::Orchestration(OrchestrationError::UnknownTool(ref n)) if n == "web_search"
        ));
    }

    #[tokio::test]
    async fn test_missing_argument_rejected() {
        let registry = ToolRegistry::new().with_tool(Arc::new(EchoTool));
        let err = registry
            .execute(&ToolCall::new("c1", "echo", r#"{"query":"x"}"#))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocAgentError::Orchestration(OrchestrationError::InvalidToolArguments { .. })
        ));
    }
}
