//! # DocAgent Providers
//!
//! Chat and embedding clients for OpenAI-compatible APIs.

pub mod embeddings;
pub mod openai_compatible;

use docagent_core::config::DocAgentConfig;
use docagent_core::error::Result;
use docagent_core::traits::{ChatProvider, EmbeddingProvider};

pub use embeddings::OpenAiEmbedder;
pub use openai_compatible::OpenAiCompatibleProvider;

/// Create the chat provider from configuration.
pub fn create_provider(config: &DocAgentConfig) -> Result<Box<dyn ChatProvider>> {
    Ok(Box::new(OpenAiCompatibleProvider::new(config)?))
}

/// Create the embedding provider from configuration.
pub fn create_embedder(config: &DocAgentConfig) -> Result<Box<dyn EmbeddingProvider>> {
    Ok(Box::new(OpenAiEmbedder::new(config)?))
}
