//! Full rebuild of the searchable collection from document chunks.

use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::embedding::EmbeddingProvider;
use docagent_core::traits::search::{SearchBackend, TextIndexSpec, VectorIndexSpec};
use docagent_core::types::{DocumentChunk, IndexedRecord};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub records: usize,
    pub dimensions: usize,
}

pub struct IndexBuilder {
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector: VectorIndexSpec,
    text: TextIndexSpec,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector: VectorIndexSpec,
        text: TextIndexSpec,
    ) -> Self {
        Self {
            backend,
            embedder,
            vector,
            text,
            batch_size: 512,
        }
    }

    pub fn from_config(
        config: &DocAgentConfig,
        backend: Arc<dyn SearchBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let (vector, text) = index_specs(config);
        Self::new(backend, embedder, vector, text).with_batch_size(config.index.embed_batch_size)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Drop the collection, embed and insert every chunk, then create the
    /// vector and full-text indexes. Any failure aborts the rebuild and may
    /// leave the collection partially populated.
    pub async fn rebuild(&self, chunks: &[DocumentChunk]) -> Result<IndexReport> {
        tracing::info!(
            "🏗️ Rebuilding index on {} with {} chunks",
            self.backend.name(),
            chunks.len()
        );
        self.backend.drop_collection().await?;

        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(DocAgentError::Embedding(format!(
                    "{} returned {} embeddings for {} chunks",
                    self.embedder.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embeddings.iter().find(|e| e.len() != self.vector.dimensions) {
                return Err(DocAgentError::Embedding(format!(
                    "Embedding has {} dimensions, index expects {}",
                    bad.len(),
                    self.vector.dimensions
                )));
            }

            let records: Vec<IndexedRecord> = batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexedRecord::new(chunk, embedding))
                .collect();
            written += self.backend.insert_records(&records).await?;
            tracing::debug!("💾 {written}/{} chunks indexed", chunks.len());
        }

        self.backend.create_vector_index(&self.vector).await?;
        self.backend.create_text_index(&self.text).await?;
        tracing::info!("✅ Index rebuilt: {written} records");

        Ok(IndexReport {
            records: written,
            dimensions: self.vector.dimensions,
        })
    }
}

/// Vector and text index definitions from the `[index]` config section.
pub fn index_specs(config: &DocAgentConfig) -> (VectorIndexSpec, TextIndexSpec) {
    (
        VectorIndexSpec {
            name: config.index.vector_index.clone(),
            path: "embedding".into(),
            dimensions: config.index.dimensions,
            similarity: config.index.similarity,
        },
        TextIndexSpec {
            name: config.index.search_index.clone(),
            field: "text".into(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteBackend;
    use async_trait::async_trait;
    use docagent_core::traits::search::Similarity;
    use docagent_core::types::ChunkMetadata;

    /// Deterministic bag-of-letters embedding.
    struct LetterEmbedder {
        dims: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; self.dims];
            for b in text.bytes().filter(u8::is_ascii_alphabetic) {
                v[(b.to_ascii_lowercase() - b'a') as usize % self.dims] += 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk {
            text: text.into(),
            metadata: ChunkMetadata {
                title: "report.pdf".into(),
                source: "https://app.box.com/file/1".into(),
                extra: Default::default(),
            },
        }
    }

    fn builder(backend: Arc<SqliteBackend>, dims: usize, index_dims: usize) -> IndexBuilder {
        IndexBuilder::new(
            backend,
            Arc::new(LetterEmbedder { dims }),
            VectorIndexSpec {
                name: "vector_index".into(),
                path: "embedding".into(),
                dimensions: index_dims,
                similarity: Similarity::Cosine,
            },
            TextIndexSpec {
                name: "search_index".into(),
                field: "text".into(),
            },
        )
        .with_batch_size(2)
    }

    #[tokio::test]
    async fn test_rebuild_indexes_every_chunk() {
        let backend = Arc::new(SqliteBackend::open_in_memory("earnings_reports").unwrap());
        let chunks: Vec<_> = ["cloud revenue", "ad spending", "chip supply", "ai capex", "margins"]
            .iter()
            .map(|t| chunk(t))
            .collect();

        let report = builder(backend.clone(), 26, 26).rebuild(&chunks).await.unwrap();
        assert_eq!(report, IndexReport { records: 5, dimensions: 26 });
        assert_eq!(backend.count().await.unwrap(), 5);

        let query = LetterEmbedder { dims: 26 }.embed("chip supply").await.unwrap();
        let hits = backend.similarity_search(&query, 5).await.unwrap();
        assert_eq!(hits[0].text, "chip supply");
        assert_eq!(backend.text_search("margins", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_collection() {
        let backend = Arc::new(SqliteBackend::open_in_memory("earnings_reports").unwrap());
        let b = builder(backend.clone(), 26, 26);
        b.rebuild(&[chunk("one"), chunk("two"), chunk("three")]).await.unwrap();
        b.rebuild(&[chunk("four")]).await.unwrap();
        assert_eq!(backend.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_rebuild_leaves_searchable_collection() {
        let backend = Arc::new(SqliteBackend::open_in_memory("earnings_reports").unwrap());
        let b = builder(backend.clone(), 26, 26);
        b.rebuild(&[chunk("cloud revenue")]).await.unwrap();

        let report = b.rebuild(&[]).await.unwrap();
        assert_eq!(report.records, 0);
        assert_eq!(backend.count().await.unwrap(), 0);
        assert!(backend.text_search("cloud", 1).await.unwrap().is_empty());
        assert!(backend.similarity_search(&[1.0; 26], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_aborts() {
        let backend = Arc::new(SqliteBackend::open_in_memory("earnings_reports").unwrap());
        let err = builder(backend, 8, 1536)
            .rebuild(&[chunk("cloud revenue")])
            .await
            .unwrap_err();
        assert!(matches!(err, DocAgentError::Embedding(_)));
    }

    #[test]
    fn test_specs_from_config() {
        let (vector, text) = index_specs(&DocAgentConfig::default());
        assert_eq!(vector.name, "vector_index");
        assert_eq!(vector.dimensions, 1536);
        assert_eq!(text.name, "search_index");
        assert_eq!(text.field, "text");
    }
}
