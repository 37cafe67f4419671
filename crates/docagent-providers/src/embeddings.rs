//! OpenAI embeddings (`/embeddings`).

use async_trait::async_trait;
use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::retry::{RetryPolicy, retry};
use docagent_core::traits::embedding::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::openai_compatible::api_error;

pub struct OpenAiEmbedder {
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Inputs per request.
    batch_size: usize,
    retry: RetryPolicy,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(config: &DocAgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_secs))
            .build()
            .map_err(|e| DocAgentError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: config.openai.api_key.clone(),
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            model: config.openai.embedding_model.clone(),
            dimensions: config.index.dimensions,
            batch_size: config.index.embed_batch_size.max(1),
            retry: RetryPolicy::from(&config.retry),
            client,
        })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| DocAgentError::Http(format!("embeddings request failed ({url}): {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(api_error("openai", status.as_u16(), &text));
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| DocAgentError::Embedding(format!("Failed to parse embeddings: {e}")))?;
        order_embeddings(body.data, input.len())
    }
}

/// Put vectors back in input order and check nothing is missing.
fn order_embeddings(mut data: Vec<EmbedData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(DocAgentError::Embedding(format!(
            "Expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        self.embed_batch(&input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocAgentError::Embedding("No embedding in response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.api_key.is_empty() {
            return Err(DocAgentError::ApiKeyMissing("openai".into()));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = retry(&self.retry, "embeddings", || self.request(batch)).await?;
            embeddings.extend(vectors);
        }
        tracing::debug!("🔢 Embedded {} texts with {}", texts.len(), self.model);
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}
