//! Chat model bound to the retrieval tools.
//!
//! The system instruction is rebuilt in front of every request and is never
//! written into the thread, so checkpoints only hold user, assistant and tool
//! turns.

use docagent_core::config::DocAgentConfig;
use docagent_core::error::Result;
use docagent_core::traits::{ChatProvider, GenerateParams};
use docagent_core::types::{Message, ToolDefinition};
use docagent_tools::ToolRegistry;
use std::sync::Arc;

/// Instruction sent ahead of the conversation, naming the available tools.
pub fn system_prompt(tool_names: &[&str]) -> String {
    format!(
        "You are a helpful AI agent. \
         You are provided with tools to answer questions about tech companies earnings. \
         Think step-by-step and use these tools to get the information required to answer the user query. \
         Do not re-run tools unless absolutely necessary. \
         If you are not able to get enough information using the tools, reply with I DON'T KNOW. \
         You have access to the following tools: {}.",
        tool_names.join(", ")
    )
}

pub struct ToolAugmentedModel {
    provider: Arc<dyn ChatProvider>,
    tools: Vec<ToolDefinition>,
    system_prompt: String,
    params: GenerateParams,
}

impl ToolAugmentedModel {
    pub fn new(provider: Arc<dyn ChatProvider>, registry: &ToolRegistry, params: GenerateParams) -> Self {
        Self {
            provider,
            tools: registry.definitions(),
            system_prompt: system_prompt(&registry.names()),
            params,
        }
    }

    /// Model, temperature and token limit come from the `[openai]` section.
    pub fn from_config(
        config: &DocAgentConfig,
        provider: Arc<dyn ChatProvider>,
        registry: &ToolRegistry,
    ) -> Self {
        let params = GenerateParams {
            model: config.openai.chat_model.clone(),
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
        };
        Self::new(provider, registry, params)
    }

    /// One completion over `messages`. With `allow_tools == false` no tool
    /// schemas are sent, so a well-behaved model has to answer in text.
    pub async fn invoke(&self, messages: &[Message], allow_tools: bool) -> Result<Message> {
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(self.system_prompt.as_str()));
        conversation.extend_from_slice(messages);

        let tools: &[ToolDefinition] = if allow_tools { &self.tools } else { &[] };
        tracing::debug!(
            "🧠 {} request: {} messages, {} tools",
            self.provider.name(),
            conversation.len(),
            tools.len()
        );

        let response = self.provider.chat(&conversation, tools, &self.params).await?;
        if response.tool_calls.is_empty() && response.content.as_deref().is_none_or(str::is_empty) {
            tracing::warn!("⚠️ {} returned neither text nor tool calls", self.provider.name());
        }
        Ok(response.into_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, stub_registry};
    use docagent_core::types::{Role, ToolCall};

    #[test]
    fn test_system_prompt_lists_tools() {
        let prompt = system_prompt(&["vector_search", "full_text_search"]);
        assert!(prompt.contains("I DON'T KNOW"));
        assert!(prompt.contains("Do not re-run tools unless absolutely necessary"));
        assert!(prompt.ends_with("tools: vector_search, full_text_search."));
    }

    #[tokio::test]
    async fn test_invoke_prepends_system_and_binds_tools() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "vector_search", r#"{"user_query":"challenges"}"#)],
        )]));
        let model = ToolAugmentedModel::new(provider.clone(), &stub_registry(), GenerateParams::default());

        let history = vec![Message::user("What are the biggest challenges facing tech companies?")];
        let reply = model.invoke(&history, true).await.unwrap();
        assert_eq!(reply.requested_tools()[0].function.name, "vector_search");

        let seen = provider.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].messages[1], history[0]);
        assert_eq!(seen[0].tool_names, vec!["vector_search", "full_text_search"]);
        // The caller's history is untouched.
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_without_tools_sends_no_schemas() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant("I DON'T KNOW")]));
        let model = ToolAugmentedModel::new(provider.clone(), &stub_registry(), GenerateParams::default());
        let reply = model.invoke(&[Message::user("q")], false).await.unwrap();
        assert_eq!(reply.content, "I DON'T KNOW");
        assert!(provider.requests()[0].tool_names.is_empty());
    }
}
