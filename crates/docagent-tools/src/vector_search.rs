//! `vector_search`: semantic lookup over the chunk collection.

use async_trait::async_trait;
use docagent_core::error::Result;
use docagent_core::traits::{EmbeddingProvider, SearchBackend, Tool};
use docagent_core::types::{ToolDefinition, ToolResult};
use std::sync::Arc;

use crate::user_query;

pub struct VectorSearchTool {
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    k: usize,
}

impl VectorSearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, embedder: Arc<dyn EmbeddingProvider>, k: usize) -> Self {
        Self {
            backend,
            embedder,
            k: k.max(1),
        }
    }

    /// Top-k chunks as `title: text`, most similar first, separated by a
    /// blank line. No match gives an empty string.
    pub async fn search(&self, query: &str) -> Result<String> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.backend.similarity_search(&embedding, self.k).await?;
        tracing::debug!("🔍 vector_search '{query}': {} hits", hits.len());
        Ok(hits
            .iter()
            .take(self.k)
            .map(|h| format!("{}: {}", h.title(), h.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl Tool for VectorSearchTool {
    fn name(&self) -> &str {
        "vector_search"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "vector_search".into(),
            description: "Retrieve information using vector search to answer a user query.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "user_query": { "type": "string", "description": "Question or topic to look up" }
                },
                "required": ["user_query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let query = user_query(self.name(), arguments)?;
        Ok(ToolResult {
            tool_call_id: String::new(),
            output: self.search(&query).await?,
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HashEmbedder, seeded_backend};

    #[tokio::test]
    async fn test_returns_at_most_k_titled_chunks() {
        let (backend, embedder) = seeded_backend().await;
        let tool = VectorSearchTool::new(backend, embedder, 5);
        let output = tool.search("cloud revenue growth").await.unwrap();
        let parts: Vec<_> = output.split("\n\n").collect();
        assert_eq!(parts.len(), 5);
        assert!(parts.iter().all(|p| p.contains(".pdf: ")));
    }

    #[tokio::test]
    async fn test_best_match_first() {
        let (backend, embedder) = seeded_backend().await;
        let tool = VectorSearchTool::new(backend, embedder, 5);
        let output = tool.search("Nvidia data center revenue").await.unwrap();
        assert!(output.starts_with("nvidia.pdf: Nvidia data center revenue"));
    }

    #[tokio::test]
    async fn test_empty_collection_gives_empty_string() {
        let backend = Arc::new(docagent_index::SqliteBackend::open_in_memory("empty").unwrap());
        backend
            .create_vector_index(&crate::testing::vector_spec())
            .await
            .unwrap();
        let tool = VectorSearchTool::new(backend, Arc::new(HashEmbedder), 5);
        assert_eq!(tool.search("anything").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_execute_accepts_json_and_bare_query() {
        let (backend, embedder) = seeded_backend().await;
        let tool = VectorSearchTool::new(backend, embedder, 2);
        let json = tool.execute(r#"{"user_query":"chip supply"}"#).await.unwrap();
        let bare = tool.execute("chip supply").await.unwrap();
        assert_eq!(json.output, bare.output);
        assert!(json.success);
    }
}
