//! MongoDB Atlas backend: `$vectorSearch` / `$search` aggregation pipelines
//! over one collection, indexes created with `createSearchIndexes`.

use async_trait::async_trait;
use docagent_core::config::IndexConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::search::{SearchBackend, TextIndexSpec, VectorIndexSpec};
use docagent_core::types::{IndexedRecord, SearchHit};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::time::Duration;

/// How long to wait for a new search index to become queryable.
const INDEX_READY_TIMEOUT: Duration = Duration::from_secs(120);
const INDEX_POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct AtlasBackend {
    database: Database,
    collection: Collection<Document>,
    collection_name: String,
    vector_index: String,
    search_index: String,
}

fn mongo_err(e: mongodb::error::Error) -> DocAgentError {
    DocAgentError::Search(format!("MongoDB: {e}"))
}

impl AtlasBackend {
    pub async fn connect(config: &IndexConfig) -> Result<Self> {
        if config.mongodb_uri.is_empty() {
            return Err(DocAgentError::Config(
                "index.mongodb_uri (MONGODB_URI) is required for the atlas backend".into(),
            ));
        }
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .map_err(mongo_err)?;
        let database = client.database(&config.database);
        let collection = database.collection::<Document>(&config.collection);
        tracing::info!(
            "🍃 Connected to MongoDB namespace {}.{}",
            config.database,
            config.collection
        );
        Ok(Self {
            database,
            collection,
            collection_name: config.collection.clone(),
            vector_index: config.vector_index.clone(),
            search_index: config.search_index.clone(),
        })
    }

    async fn create_search_index(&self, name: &str, kind: &str, definition: Document) -> Result<()> {
        self.database
            .run_command(doc! {
                "createSearchIndexes": self.collection_name.as_str(),
                "indexes": [{ "name": name, "type": kind, "definition": definition }],
            })
            .await
            .map_err(mongo_err)?;
        self.wait_until_queryable(name).await
    }

    async fn wait_until_queryable(&self, name: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + INDEX_READY_TIMEOUT;
        loop {
            let mut cursor = self
                .collection
                .aggregate(vec![doc! { "$listSearchIndexes": { "name": name } }])
                .await
                .map_err(mongo_err)?;
            if let Some(index) = cursor.try_next().await.map_err(mongo_err)? {
                if index.get_bool("queryable").unwrap_or(false) {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DocAgentError::Search(format!(
                    "Search index '{name}' not queryable after {}s",
                    INDEX_READY_TIMEOUT.as_secs()
                )));
            }
            tracing::debug!("⏳ Waiting for search index '{name}'");
            tokio::time::sleep(INDEX_POLL_INTERVAL).await;
        }
    }

    async fn run_search(&self, pipeline: Vec<Document>) -> Result<Vec<SearchHit>> {
        let cursor = self.collection.aggregate(pipeline).await.map_err(mongo_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(mongo_err)?;
        Ok(docs.into_iter().map(document_to_hit).collect())
    }
}

/// Split an aggregation result into text, score and remaining metadata.
fn document_to_hit(mut doc: Document) -> SearchHit {
    let text = doc.get_str("text").unwrap_or_default().to_string();
    let score = doc.get_f64("score").unwrap_or(0.0) as f32;
    doc.remove("text");
    doc.remove("score");
    doc.remove("_id");
    let metadata = match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Default::default(),
    };
    SearchHit {
        text,
        metadata,
        score,
    }
}

#[async_trait]
impl SearchBackend for AtlasBackend {
    async fn drop_collection(&self) -> Result<()> {
        self.collection.drop().await.map_err(mongo_err)?;
        // Search indexes need an existing collection, even when nothing gets inserted.
        self.database
            .create_collection(&self.collection_name)
            .await
            .map_err(mongo_err)?;
        tracing::info!("🗑️ Dropped and recreated collection '{}'", self.collection_name);
        Ok(())
    }

    async fn insert_records(&self, records: &[IndexedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let docs = records
            .iter()
            .map(|r| mongodb::bson::to_document(&r.to_document()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DocAgentError::Search(format!("BSON encoding failed: {e}")))?;
        let result = self.collection.insert_many(docs).await.map_err(mongo_err)?;
        Ok(result.inserted_ids.len())
    }

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()> {
        let definition = doc! {
            "fields": [{
                "type": "vector",
                "path": spec.path.as_str(),
                "numDimensions": spec.dimensions as i32,
                "similarity": spec.similarity.as_str(),
            }]
        };
        self.create_search_index(&spec.name, "vectorSearch", definition).await?;
        tracing::info!("🧭 Vector index '{}' ready", spec.name);
        Ok(())
    }

    async fn create_text_index(&self, spec: &TextIndexSpec) -> Result<()> {
        let mut fields = Document::new();
        fields.insert(spec.field.clone(), vec![doc! { "type": "string" }]);
        let definition = doc! { "mappings": { "dynamic": false, "fields": fields } };
        self.create_search_index(&spec.name, "search", definition).await?;
        tracing::info!("🔎 Full-text index '{}' ready", spec.name);
        Ok(())
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let vector: Vec<f64> = embedding.iter().map(|v| *v as f64).collect();
        let pipeline = vec![
            doc! { "$vectorSearch": {
                "index": self.vector_index.as_str(),
                "path": "embedding",
                "queryVector": vector,
                "numCandidates": (k * 10) as i64,
                "limit": k as i64,
            }},
            doc! { "$set": { "score": { "$meta": "vectorSearchScore" } } },
        ];
        self.run_search(pipeline).await
    }

    async fn text_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let pipeline = vec![
            doc! { "$search": {
                "index": self.search_index.as_str(),
                "text": { "query": query, "path": "text" },
            }},
            doc! { "$set": { "score": { "$meta": "searchScore" } } },
            doc! { "$limit": k as i64 },
        ];
        self.run_search(pipeline).await
    }

    async fn count(&self) -> Result<usize> {
        let n = self
            .collection
            .count_documents(doc! {})
            .await
            .map_err(mongo_err)?;
        Ok(n as usize)
    }

    fn name(&self) -> &str {
        "atlas"
    }
}
