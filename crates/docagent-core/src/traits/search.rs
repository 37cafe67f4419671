//! Document collection with vector and full-text indexes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{IndexedRecord, SearchHit};

/// Vector similarity metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl Similarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::DotProduct => "dotProduct",
            Similarity::Euclidean => "euclidean",
        }
    }

    /// Higher-is-better score in `[0, 1]` for two vectors of equal length.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Similarity::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    return 0.0;
                }
                (1.0 + dot / (na * nb)) / 2.0
            }
            Similarity::DotProduct => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                (1.0 + dot) / 2.0
            }
            Similarity::Euclidean => {
                let dist = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + dist)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndexSpec {
    pub name: String,
    /// Field holding the vector.
    pub path: String,
    pub dimensions: usize,
    pub similarity: Similarity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextIndexSpec {
    pub name: String,
    /// Field holding the raw chunk text.
    pub field: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Drop the collection and its indexes, leaving an empty collection
    /// behind. Succeeds when nothing exists.
    async fn drop_collection(&self) -> Result<()>;

    /// Bulk insert. Returns the number of records written.
    async fn insert_records(&self, records: &[IndexedRecord]) -> Result<usize>;

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()>;

    async fn create_text_index(&self, spec: &TextIndexSpec) -> Result<()>;

    /// At most `k` hits, most similar first.
    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// At most `k` keyword matches, best ranked first.
    async fn text_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;

    async fn count(&self) -> Result<usize>;

    fn name(&self) -> &str;
}
