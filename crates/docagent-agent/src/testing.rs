//! Scripted chat provider and stub tools for the agent tests.

use async_trait::async_trait;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::{ChatProvider, GenerateParams, Tool};
use docagent_core::types::{Message, ProviderResponse, ToolDefinition, ToolResult};
use docagent_tools::ToolRegistry;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the provider was asked.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Replays a fixed list of assistant messages, one per call.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Message>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        _params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        self.seen.lock().unwrap().push(SeenRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DocAgentError::Provider("script exhausted".into()))?;
        Ok(ProviderResponse {
            content: Some(next.content.clone()),
            tool_calls: next.requested_tools().to_vec(),
            finish_reason: Some("stop".into()),
            usage: None,
        })
    }
}

/// Answers with `"<name>: <arguments>"`, optionally after a delay or with an error.
pub struct StubTool {
    name: &'static str,
    delay_ms: u64,
    fail: bool,
}

impl StubTool {
    pub fn new(name: &'static str) -> Self {
        Self { name, delay_ms: 0, fail: false }
    }

    pub fn slow(name: &'static str, delay_ms: u64) -> Self {
        Self { name, delay_ms, fail: false }
    }

    pub fn failing(name: &'static str) -> Self {
        Self { name, delay_ms: 0, fail: true }
    }
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.into(),
            description: format!("stub {}", self.name),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "user_query": { "type": "string" } },
                "required": ["user_query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            return Err(DocAgentError::Search("backend unavailable".into()));
        }
        Ok(ToolResult {
            tool_call_id: String::new(),
            output: format!("{}: {arguments}", self.name),
            success: true,
        })
    }
}

pub fn stub_registry() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Arc::new(StubTool::new("vector_search")))
        .with_tool(Arc::new(StubTool::new("full_text_search")))
}
