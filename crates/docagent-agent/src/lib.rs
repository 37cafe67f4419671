//! # DocAgent Agent
//!
//! The tool-augmented chat model and the checkpointed graph that alternates
//! between it and the retrieval tools until the model answers in text.
//!
//! - **Round guard**: after `max_tool_rounds` tool rounds in one turn the
//!   model is called without tool schemas
//! - **Checkpoints**: thread state is persisted after every node
//! - **Resume**: an interrupted turn continues from the recorded node

pub mod graph;
pub mod model;

#[cfg(test)]
mod testing;

pub use graph::{AgentGraph, GraphRun, NodeUpdate};
pub use model::{ToolAugmentedModel, system_prompt};
