//! `full_text_search`: keyword lookup returning the single best chunk.

use async_trait::async_trait;
use docagent_core::error::Result;
use docagent_core::traits::{SearchBackend, Tool};
use docagent_core::types::{ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::user_query;

/// Output when nothing matches.
pub const NOT_FOUND: &str = "Document not found";

/// Metadata of the best keyword match plus its text. Never carries the
/// stored embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FullTextHit {
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
    pub page_content: String,
}

pub struct FullTextSearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl FullTextSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    pub async fn search(&self, query: &str) -> Result<Option<FullTextHit>> {
        let hits = self.backend.text_search(query, 1).await?;
        Ok(hits.into_iter().next().map(|hit| {
            let mut metadata = hit.metadata;
            metadata.remove("embedding");
            metadata.remove("page_content");
            FullTextHit {
                metadata,
                page_content: hit.text,
            }
        }))
    }
}

#[async_trait]
impl Tool for FullTextSearchTool {
    fn name(&self) -> &str {
        "full_text_search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "full_text_search".into(),
            description: "Retrieve the most relevant document chunk and its metadata using keyword search.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "user_query": { "type": "string", "description": "Keywords or exact phrase to look up" }
                },
                "required": ["user_query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let query = user_query(self.name(), arguments)?;
        let output = match self.search(&query).await? {
            Some(hit) => serde_json::to_string(&hit)?,
            None => NOT_FOUND.to_string(),
        };
        Ok(ToolResult {
            tool_call_id: String::new(),
            output,
            success: true,
        })
    }
}
