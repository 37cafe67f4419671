//! Fixtures for the tool tests: a hashing embedder and a seeded SQLite collection.

use async_trait::async_trait;
use docagent_core::error::Result;
use docagent_core::traits::search::{Similarity, TextIndexSpec, VectorIndexSpec};
use docagent_core::traits::{EmbeddingProvider, SearchBackend};
use docagent_core::types::{ChunkMetadata, DocumentChunk, IndexedRecord};
use docagent_index::SqliteBackend;
use std::sync::Arc;

pub const DIMS: usize = 64;

/// Bag of lowercase words hashed into `DIMS` buckets.
pub struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; DIMS];
        for word in text.split_whitespace() {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            v[(hash % DIMS as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "hash"
    }
}

pub fn vector_spec() -> VectorIndexSpec {
    VectorIndexSpec {
        name: "vector_index".into(),
        path: "embedding".into(),
        dimensions: DIMS,
        similarity: Similarity::Cosine,
    }
}

const CORPUS: &[(&str, &str)] = &[
    ("nvidia.pdf", "Nvidia data center revenue"),
    ("meta.pdf", "Headcount was the largest driver of expense growth in Q4"),
    ("microsoft.pdf", "Microsoft Azure cloud revenue grew 31 percent"),
    ("apple.pdf", "Apple services margins expanded while iPhone sales held steady"),
    ("amazon.pdf", "AWS cloud revenue growth accelerated"),
    ("tsmc.pdf", "Chip supply constraints eased for advanced packaging"),
    ("alphabet.pdf", "Google ad spending recovered across search and YouTube"),
];

pub async fn seeded_backend() -> (Arc<dyn SearchBackend>, Arc<dyn EmbeddingProvider>) {
    let backend = SqliteBackend::open_in_memory("earnings_reports").unwrap();
    let embedder = HashEmbedder;
    let mut records = Vec::new();
    for (title, text) in CORPUS {
        let chunk = DocumentChunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                title: title.to_string(),
                source: format!("https://app.box.com/file/{title}"),
                extra: Default::default(),
            },
        };
        records.push(IndexedRecord::new(chunk, embedder.embed(text).await.unwrap()));
    }
    backend.insert_records(&records).await.unwrap();
    backend.create_vector_index(&vector_spec()).await.unwrap();
    backend
        .create_text_index(&TextIndexSpec {
            name: "search_index".into(),
            field: "text".into(),
        })
        .await
        .unwrap();
    (Arc::new(backend), Arc::new(embedder))
}
