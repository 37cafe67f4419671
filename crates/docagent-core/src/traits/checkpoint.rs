//! Per-thread conversation checkpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Message;

/// Node of the agent/tools graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GraphNode {
    Agent,
    Tools,
    End,
}

impl GraphNode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphNode::Agent => "agent",
            GraphNode::Tools => "tools",
            GraphNode::End => "end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(GraphNode::Agent),
            "tools" => Some(GraphNode::Tools),
            "end" => Some(GraphNode::End),
            _ => None,
        }
    }
}

impl std::fmt::Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full thread state after a completed node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Monotonic per thread, starting at 0.
    pub step: u64,
    /// Node to run next; `End` means the last turn finished.
    pub next: GraphNode,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(thread_id: &str, step: u64, next: GraphNode, messages: Vec<Message>) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step,
            next,
            messages,
            created_at: Utc::now(),
        }
    }
}

/// Durable checkpoint storage keyed by thread id.
///
/// Concurrent turns on the same thread are not coordinated here.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Most recent checkpoint of the thread.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Known thread ids, most recently updated first.
    async fn list_threads(&self) -> Result<Vec<String>>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    fn name(&self) -> &str;
}
