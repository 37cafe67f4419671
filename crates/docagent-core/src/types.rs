//! Conversation and document data model shared by every crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// One conversation turn. Serializes directly into the chat-completions wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set on tool results: the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on assistant messages that request tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message carrying tool-call requests.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        }
    }

    /// Tool result answering `tool_call_id`.
    pub fn tool(content: impl Into<String>, tool_call_id: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: None,
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Tool calls requested by this message (empty for anything but assistant requests).
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.requested_tools().is_empty()
    }
}

/// A tool invocation requested by the chat model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(default = "function_type")]
    pub r#type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".into()
}

impl ToolCall {
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            r#type: function_type(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// Function name plus JSON-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Schema advertised to the model for one tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// Output of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: String,
    pub success: bool,
}

/// Raw chat-completion result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// Convert into the assistant message appended to the thread.
    pub fn into_message(self) -> Message {
        Message::assistant_with_tools(self.content.unwrap_or_default(), self.tool_calls)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Metadata carried by every chunk. Extra loader fields are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub title: String,
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A fixed-size window of a loaded document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk plus its embedding, as written to the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

impl IndexedRecord {
    pub fn new(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        Self {
            text: chunk.text,
            metadata: chunk.metadata,
            embedding,
        }
    }

    /// Flat document layout used by the backends: `text`, `embedding`, then metadata fields.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("text".into(), Value::String(self.text.clone()));
        doc.insert(
            "embedding".into(),
            Value::Array(
                self.embedding
                    .iter()
                    .map(|v| serde_json::json!(v))
                    .collect(),
            ),
        );
        doc.insert("title".into(), Value::String(self.metadata.title.clone()));
        doc.insert("source".into(), Value::String(self.metadata.source.clone()));
        for (k, v) in &self.metadata.extra {
            doc.entry(k.clone()).or_insert_with(|| v.clone());
        }
        doc
    }
}

/// A record returned by a similarity or keyword query.
///
/// `metadata` holds every stored field except `text`, so it may still carry
/// the raw `embedding`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub metadata: Map<String, Value>,
    pub score: f32,
}

impl SearchHit {
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg = Message::tool("result", "call_1");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_assistant_without_calls_has_no_tool_calls_field() {
        let msg = Message::assistant_with_tools("done", vec![]);
        assert!(!msg.has_tool_calls());
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_tool_call_type_defaults_to_function() {
        let call: ToolCall = serde_json::from_str(
            r#"{"id":"c1","function":{"name":"vector_search","arguments":"{}"}}"#,
        )
        .unwrap();
        assert_eq!(call.r#type, "function");
        assert_eq!(call.function.name, "vector_search");
    }

    #[test]
    fn test_record_document_layout() {
        let chunk = DocumentChunk {
            text: "Revenue grew 12%".into(),
            metadata: ChunkMetadata {
                title: "q4.pdf".into(),
                source: "https://app.box.com/file/1".into(),
                extra: Map::new(),
            },
        };
        let doc = IndexedRecord::new(chunk, vec![0.5, 0.25]).to_document();
        assert_eq!(doc["text"], "Revenue grew 12%");
        assert_eq!(doc["title"], "q4.pdf");
        assert_eq!(doc["embedding"].as_array().unwrap().len(), 2);
    }
}
