//! Tool trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ToolDefinition, ToolResult};

/// A function the chat model may call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Execute with JSON-encoded `arguments`.
    async fn execute(&self, arguments: &str) -> Result<ToolResult>;
}
