//! # DocAgent Memory
//!
//! Durable per-thread conversation checkpoints for the agent graph.

pub mod memory;
#[cfg(feature = "atlas")]
pub mod mongo;
pub mod sqlite;

use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::Checkpointer;
use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryCheckpointer;
pub use sqlite::SqliteCheckpointer;

/// Open the checkpointer selected by `checkpoint.backend`.
pub async fn open_checkpointer(config: &DocAgentConfig) -> Result<Arc<dyn Checkpointer>> {
    match config.checkpoint.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteCheckpointer::open(Path::new(
            &config.checkpoint.path,
        ))?)),
        "memory" => Ok(Arc::new(MemoryCheckpointer::new())),
        #[cfg(feature = "atlas")]
        "atlas" => Ok(Arc::new(
            mongo::MongoCheckpointer::connect(
                &config.index.mongodb_uri,
                &config.index.database,
                &config.checkpoint.collection,
            )
            .await?,
        )),
        #[cfg(not(feature = "atlas"))]
        "atlas" => Err(DocAgentError::Config(
            "checkpoint.backend = \"atlas\" requires building with --features atlas".into(),
        )),
        other => Err(DocAgentError::Config(format!(
            "Unknown checkpoint backend: {other}"
        ))),
    }
}
