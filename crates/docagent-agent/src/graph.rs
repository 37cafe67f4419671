//! The agent ⇄ tools graph.
//!
//! ```text
//! START → agent ──(tool calls)──→ tools ──→ agent
//!           └──(no tool calls)──→ END
//! ```
//!
//! Thread state is the full message list. It is checkpointed once the user
//! input is appended and again after every node, so an interrupted turn can
//! be picked up with [`AgentGraph::resume`].

use crate::model::ToolAugmentedModel;
use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, OrchestrationError, Result};
use docagent_core::traits::checkpoint::{Checkpoint, Checkpointer, GraphNode};
use docagent_core::types::{Message, Role, ToolCall};
use docagent_tools::ToolRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Messages a node appended to the thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeUpdate {
    pub node: GraphNode,
    pub messages: Vec<Message>,
}

/// Result of driving one thread to END.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRun {
    pub thread_id: String,
    pub steps: Vec<NodeUpdate>,
    /// Content of the final assistant message.
    pub answer: String,
}

pub struct AgentGraph {
    model: ToolAugmentedModel,
    registry: ToolRegistry,
    checkpointer: Arc<dyn Checkpointer>,
    max_tool_rounds: usize,
    parallel_tool_calls: bool,
}

impl AgentGraph {
    pub fn new(model: ToolAugmentedModel, registry: ToolRegistry, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            model,
            registry,
            checkpointer,
            max_tool_rounds: 10,
            parallel_tool_calls: false,
        }
    }

    pub fn from_config(
        config: &DocAgentConfig,
        model: ToolAugmentedModel,
        registry: ToolRegistry,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self::new(model, registry, checkpointer)
            .with_max_tool_rounds(config.agent.max_tool_rounds)
            .with_parallel_tool_calls(config.agent.parallel_tool_calls)
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    /// Append `input` as a user turn and run the thread until END.
    pub async fn invoke(&self, thread_id: &str, input: &str) -> Result<GraphRun> {
        let latest = self.checkpointer.latest(thread_id).await?;
        let (step, mut messages) = match latest {
            Some(cp) if cp.next != GraphNode::End => {
                return Err(OrchestrationError::Interrupted {
                    thread_id: thread_id.to_string(),
                    node: cp.next.to_string(),
                }
                .into());
            }
            Some(cp) => (cp.step + 1, cp.messages),
            None => (0, Vec::new()),
        };

        tracing::info!("💬 Thread {thread_id}: new turn ({} prior messages)", messages.len());
        messages.push(Message::user(input));
        self.checkpointer
            .put(&Checkpoint::new(thread_id, step, GraphNode::Agent, messages.clone()))
            .await?;

        self.run(thread_id, step, GraphNode::Agent, messages).await
    }

    /// Continue an unfinished turn from its last checkpoint.
    pub async fn resume(&self, thread_id: &str) -> Result<GraphRun> {
        match self.checkpointer.latest(thread_id).await? {
            Some(cp) if cp.next != GraphNode::End => {
                tracing::info!("⏯️ Resuming thread {thread_id} at {} (step {})", cp.next, cp.step);
                self.run(thread_id, cp.step, cp.next, cp.messages).await
            }
            _ => Err(OrchestrationError::NothingToResume(thread_id.to_string()).into()),
        }
    }

    /// Messages of the thread's latest checkpoint; empty for an unknown thread.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .checkpointer
            .latest(thread_id)
            .await?
            .map(|cp| cp.messages)
            .unwrap_or_default())
    }

    async fn run(
        &self,
        thread_id: &str,
        mut step: u64,
        mut node: GraphNode,
        mut messages: Vec<Message>,
    ) -> Result<GraphRun> {
        let mut steps = Vec::new();

        while node != GraphNode::End {
            if messages.is_empty() {
                return Err(OrchestrationError::EmptyState(thread_id.to_string()).into());
            }

            let appended = if node == GraphNode::Agent {
                let rounds = tool_rounds_since_user(&messages);
                let allow_tools = rounds < self.max_tool_rounds;
                let reply = self.model.invoke(&messages, allow_tools).await?;
                if reply.has_tool_calls() {
                    if !allow_tools {
                        return Err(OrchestrationError::ToolRoundLimit(self.max_tool_rounds).into());
                    }
                    tracing::info!(
                        "🔧 Tool round {}/{}: {} tool call(s)",
                        rounds + 1,
                        self.max_tool_rounds,
                        reply.requested_tools().len()
                    );
                }
                vec![reply]
            } else {
                let calls = messages
                    .last()
                    .map(|m| m.requested_tools().to_vec())
                    .unwrap_or_default();
                match self.run_tools(&calls).await {
                    Ok(results) => results,
                    // Retrying cannot fix a bad request: drop it and close the turn.
                    Err(DocAgentError::Orchestration(err)) => {
                        messages.pop();
                        tracing::warn!("↩️ Thread {thread_id}: {err}; discarding the tool request");
                        self.checkpointer
                            .put(&Checkpoint::new(thread_id, step + 1, GraphNode::End, messages))
                            .await?;
                        return Err(err.into());
                    }
                    Err(err) => return Err(err),
                }
            };

            let next = route(node, &appended);
            messages.extend(appended.iter().cloned());
            steps.push(NodeUpdate {
                node,
                messages: appended,
            });

            step += 1;
            self.checkpointer
                .put(&Checkpoint::new(thread_id, step, next, messages.clone()))
                .await?;
            node = next;
        }

        let answer = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        tracing::info!("✅ Thread {thread_id} reached END after {} node(s)", steps.len());
        Ok(GraphRun {
            thread_id: thread_id.to_string(),
            steps,
            answer,
        })
    }

    /// One tool message per call, in call order.
    async fn run_tools(&self, calls: &[ToolCall]) -> Result<Vec<Message>> {
        let results = if self.parallel_tool_calls {
            futures::future::try_join_all(calls.iter().map(|call| self.registry.execute(call))).await?
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.registry.execute(call).await?);
            }
            results
        };
        Ok(calls
            .iter()
            .zip(results)
            .map(|(call, result)| Message::tool(result.output, &call.id))
            .collect())
    }
}

/// Edge taken after `node` appended `appended`.
fn route(node: GraphNode, appended: &[Message]) -> GraphNode {
    match node {
        GraphNode::Agent if appended.iter().any(Message::has_tool_calls) => GraphNode::Tools,
        GraphNode::Agent => GraphNode::End,
        GraphNode::Tools => GraphNode::Agent,
        GraphNode::End => GraphNode::End,
    }
}

/// Assistant tool requests since the most recent user message.
fn tool_rounds_since_user(messages: &[Message]) -> usize {
    messages
        .iter()
        .rev()
        .take_while(|m| m.role != Role::User)
        .filter(|m| m.has_tool_calls())
        .count()
}
