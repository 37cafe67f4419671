//! OpenAI-compatible chat provider.
//!
//! Speaks the `/chat/completions` wire format, so any endpoint that mirrors
//! the OpenAI API (Azure proxies, local gateways) works by changing `base_url`.

use async_trait::async_trait;
use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::retry::{RetryPolicy, retry};
use docagent_core::traits::provider::{ChatProvider, GenerateParams};
use docagent_core::types::{
    FunctionCall, Message, ProviderResponse, ToolCall, ToolDefinition, Usage,
};
use serde_json::{Value, json};
use std::time::Duration;

pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: String,
    /// e.g. "https://api.openai.com/v1"
    base_url: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &DocAgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_secs))
            .build()
            .map_err(|e| DocAgentError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            name: "openai".to_string(),
            api_key: config.openai.api_key.clone(),
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(&config.retry),
            client,
        })
    }

    fn build_body(messages: &[Message], tools: &[ToolDefinition], params: &GenerateParams) -> Value {
        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "messages": messages,
        });

        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }
        body
    }

    async fn send_chat(&self, body: &Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                DocAgentError::Http(format!("{} connection failed ({url}): {e}", self.name))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(api_error(&self.name, status.as_u16(), &text));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| DocAgentError::Http(format!("{} response read failed: {e}", self.name)))?;
        decode_body(&self.name, &text)
    }
}

/// A completed request with an undecodable body is not worth repeating.
fn decode_body(service: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| DocAgentError::Provider(format!("Failed to parse {service} response: {e}")))
}

/// Turn an error body (`{"error": {"message", "code"}}`) into `DocAgentError::Api`.
pub(crate) fn api_error(service: &str, status: u16, body: &str) -> DocAgentError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = parsed["error"]["message"]
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| body.to_string());
    let code = parsed["error"]["code"]
        .as_str()
        .or_else(|| parsed["error"]["type"].as_str())
        .map(String::from);
    DocAgentError::Api {
        service: service.to_string(),
        status,
        code,
        message,
        conflicts: Vec::new(),
    }
}

/// Parse a `/chat/completions` response body.
pub(crate) fn parse_chat_response(json: &Value) -> Result<ProviderResponse> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| DocAgentError::Provider("No choices in response".into()))?;

    let content = choice["message"]["content"].as_str().map(String::from);

    let tool_calls = if let Some(tc) = choice["message"]["tool_calls"].as_array() {
        tc.iter()
            .filter_map(|t| {
                Some(ToolCall {
                    id: t["id"].as_str().unwrap_or("").to_string(),
                    r#type: "function".to_string(),
                    function: FunctionCall {
                        name: t["function"]["name"].as_str()?.to_string(),
                        arguments: t["function"]["arguments"].as_str().unwrap_or("{}").to_string(),
                    },
                })
            })
            .collect()
    } else {
        vec![]
    };

    let usage = json["usage"].as_object().map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    });

    Ok(ProviderResponse {
        content,
        tool_calls,
        finish_reason: choice["finish_reason"].as_str().map(String::from),
        usage,
    })
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        if self.api_key.is_empty() {
            return Err(DocAgentError::ApiKeyMissing(self.name.clone()));
        }

        let body = Self::build_body(messages, tools, params);
        tracing::debug!(
            "🧠 {} chat: model={}, messages={}, tools={}",
            self.name,
            params.model,
            messages.len(),
            tools.len()
        );

        let json = retry(&self.retry, "chat completion", || self.send_chat(&body)).await?;
        let response = parse_chat_response(&json)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "📊 tokens: prompt={}, completion={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(response)
    }
}
