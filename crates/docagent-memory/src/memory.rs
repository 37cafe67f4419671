//! In-process checkpoint store. Nothing survives a restart.

use async_trait::async_trait;
use docagent_core::error::Result;
use docagent_core::traits::checkpoint::{Checkpoint, Checkpointer};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkpoint of a thread, oldest first.
    pub async fn history(&self, thread_id: &str) -> Vec<Checkpoint> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut threads = self.threads.write().await;
        let steps = threads.entry(checkpoint.thread_id.clone()).or_default();
        steps.retain(|c| c.step != checkpoint.step);
        steps.push(checkpoint.clone());
        steps.sort_by_key(|c| c.step);
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .and_then(|steps| steps.last().cloned()))
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let threads = self.threads.read().await;
        let mut ids: Vec<(&String, chrono::DateTime<chrono::Utc>)> = threads
            .iter()
            .filter_map(|(id, steps)| steps.last().map(|c| (id, c.created_at)))
            .collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Ok(ids.into_iter().map(|(id, _)| id.clone()).collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docagent_core::traits::checkpoint::GraphNode;
    use docagent_core::types::Message;

    #[tokio::test]
    async fn test_put_and_latest() {
        let store = MemoryCheckpointer::new();
        store
            .put(&Checkpoint::new("t", 0, GraphNode::Agent, vec![Message::user("q")]))
            .await
            .unwrap();
        store
            .put(&Checkpoint::new("t", 1, GraphNode::End, vec![Message::user("q"), Message::assistant("a")]))
            .await
            .unwrap();
        assert_eq!(store.latest("t").await.unwrap().unwrap().step, 1);
        assert_eq!(store.history("t").await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let store = MemoryCheckpointer::new();
        store
            .put(&Checkpoint::new("t", 0, GraphNode::End, vec![]))
            .await
            .unwrap();
        store.delete_thread("t").await.unwrap();
        assert!(store.latest("t").await.unwrap().is_none());
        assert!(store.list_threads().await.unwrap().is_empty());
    }
}
