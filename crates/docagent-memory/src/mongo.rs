//! MongoDB checkpoint store: one document per (thread, step).

use async_trait::async_trait;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::checkpoint::{Checkpoint, Checkpointer};
use futures::TryStreamExt;
use mongodb::bson::{self, Document, doc};
use mongodb::{Client, Collection};

pub struct MongoCheckpointer {
    collection: Collection<Document>,
}

fn mongo_err(e: mongodb::error::Error) -> DocAgentError {
    DocAgentError::Checkpoint(format!("MongoDB: {e}"))
}

impl MongoCheckpointer {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        if uri.is_empty() {
            return Err(DocAgentError::Config(
                "index.mongodb_uri (MONGODB_URI) is required for the atlas checkpointer".into(),
            ));
        }
        let client = Client::with_uri_str(uri).await.map_err(mongo_err)?;
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }
}

fn to_document(checkpoint: &Checkpoint) -> Result<Document> {
    Ok(doc! {
        "thread_id": checkpoint.thread_id.as_str(),
        "step": checkpoint.step as i64,
        "next": checkpoint.next.as_str(),
        // Messages are kept as a JSON string so the stored shape matches the wire format exactly.
        "messages": serde_json::to_string(&checkpoint.messages)?,
        "created_at": checkpoint.created_at.to_rfc3339(),
    })
}

fn from_document(doc: &Document) -> Result<Checkpoint> {
    let field = |e: bson::document::ValueAccessError| {
        DocAgentError::Checkpoint(format!("Malformed checkpoint document: {e}"))
    };
    let next = doc.get_str("next").map_err(field)?;
    Ok(Checkpoint {
        thread_id: doc.get_str("thread_id").map_err(field)?.to_string(),
        step: doc.get_i64("step").map_err(field)? as u64,
        next: docagent_core::traits::checkpoint::GraphNode::parse(next)
            .ok_or_else(|| DocAgentError::Checkpoint(format!("Unknown node '{next}'")))?,
        messages: serde_json::from_str(doc.get_str("messages").map_err(field)?)?,
        created_at: chrono::DateTime::parse_from_rfc3339(doc.get_str("created_at").map_err(field)?)
            .map(|d| d.with_timezone(&chrono::Utc))
            .map_err(|e| DocAgentError::Checkpoint(format!("Bad checkpoint timestamp: {e}")))?,
    })
}

#[async_trait]
impl Checkpointer for MongoCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let filter = doc! {
            "thread_id": checkpoint.thread_id.as_str(),
            "step": checkpoint.step as i64,
        };
        self.collection
            .replace_one(filter, to_document(checkpoint)?)
            .upsert(true)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let found = self
            .collection
            .find_one(doc! { "thread_id": thread_id })
            .sort(doc! { "step": -1 })
            .await
            .map_err(mongo_err)?;
        found.as_ref().map(from_document).transpose()
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$thread_id", "updated": { "$max": "$created_at" } } },
            doc! { "$sort": { "updated": -1, "_id": 1 } },
        ];
        let cursor = self.collection.aggregate(pipeline).await.map_err(mongo_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(mongo_err)?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_str("_id").ok().map(String::from))
            .collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.collection
            .delete_many(doc! { "thread_id": thread_id })
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docagent_core::traits::checkpoint::GraphNode;
    use docagent_core::types::{Message, ToolCall};

    #[test]
    fn test_document_round_trip() {
        let cp = Checkpoint::new(
            "001",
            3,
            GraphNode::Tools,
            vec![
                Message::user("q"),
                Message::assistant_with_tools("", vec![ToolCall::new("c1", "vector_search", "{}")]),
            ],
        );
        let back = from_document(&to_document(&cp).unwrap()).unwrap();
        assert_eq!(back.thread_id, "001");
        assert_eq!(back.step, 3);
        assert_eq!(back.next, GraphNode::Tools);
        assert_eq!(back.messages, cp.messages);
    }
}
