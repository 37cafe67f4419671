//! # DocAgent Index
//!
//! Search backends for the chunk collection and the builder that fills them.
//! SQLite is always available; MongoDB Atlas needs the `atlas` feature.

#[cfg(feature = "atlas")]
pub mod atlas;
pub mod builder;
pub mod sqlite;

use docagent_core::config::DocAgentConfig;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::SearchBackend;
use std::path::Path;
use std::sync::Arc;

pub use builder::{IndexBuilder, IndexReport, index_specs};
pub use sqlite::SqliteBackend;

/// Open the backend selected by `index.backend`.
pub async fn open_backend(config: &DocAgentConfig) -> Result<Arc<dyn SearchBackend>> {
    match config.index.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteBackend::open(
            Path::new(&config.index.sqlite_path),
            &config.index.collection,
        )?)),
        #[cfg(feature = "atlas")]
        "atlas" => Ok(Arc::new(atlas::AtlasBackend::connect(&config.index).await?)),
        #[cfg(not(feature = "atlas"))]
        "atlas" => Err(DocAgentError::Config(
            "index.backend = \"atlas\" requires building with --features atlas".into(),
        )),
        other => Err(DocAgentError::Config(format!("Unknown index backend: {other}"))),
    }
}
