//! # DocAgent Tools
//!
//! The two retrieval tools the agent can call, and the registry that binds
//! them to the chat model.

pub mod full_text_search;
pub mod registry;
pub mod vector_search;

#[cfg(test)]
mod testing;

use docagent_core::config::DocAgentConfig;
use docagent_core::error::{OrchestrationError, Result};
use docagent_core::traits::{EmbeddingProvider, SearchBackend};
use serde_json::Value;
use std::sync::Arc;

pub use full_text_search::{FullTextHit, FullTextSearchTool, NOT_FOUND};
pub use registry::{ToolRegistry, validate_args};
pub use vector_search::VectorSearchTool;

/// Registry with `vector_search` and `full_text_search` over `backend`.
pub fn retrieval_registry(
    config: &DocAgentConfig,
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Arc::new(VectorSearchTool::new(
            backend.clone(),
            embedder,
            config.index.vector_k,
        )))
        .with_tool(Arc::new(FullTextSearchTool::new(backend)))
}

/// Extract the `user_query` argument. A JSON string or a non-JSON argument
/// is taken as the query itself.
pub(crate) fn user_query(tool: &str, arguments: &str) -> Result<String> {
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map
            .get("user_query")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                OrchestrationError::InvalidToolArguments {
                    tool: tool.to_string(),
                    reason: "expected a string 'user_query'".into(),
                }
                .into()
            }),
        Ok(Value::String(s)) => Ok(s),
        _ => Ok(arguments.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_query_forms() {
        assert_eq!(user_query("t", r#"{"user_query":"ai capex"}"#).unwrap(), "ai capex");
        assert_eq!(user_query("t", r#""ai capex""#).unwrap(), "ai capex");
        assert_eq!(user_query("t", "ai capex").unwrap(), "ai capex");
        assert!(user_query("t", r#"{"query":"ai capex"}"#).is_err());
    }

    #[tokio::test]
    async fn test_retrieval_registry_names() {
        let (backend, embedder) = testing::seeded_backend().await;
        let registry = retrieval_registry(&DocAgentConfig::default(), backend, embedder);
        assert_eq!(registry.names(), vec!["vector_search", "full_text_search"]);
        assert_eq!(registry.definitions().len(), 2);
    }
}
