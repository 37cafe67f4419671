//! DocAgent configuration system.
//!
//! Everything is resolved once at startup into a [`DocAgentConfig`] that is
//! passed explicitly to each component. Secrets left empty in the TOML file
//! fall back to the usual environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DocAgentError, Result};
use crate::traits::search::Similarity;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocAgentConfig {
    #[serde(default, rename = "box")]
    pub box_store: BoxConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl DocAgentConfig {
    /// Load config from the default path (~/.docagent/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.resolved(|key| std::env::var(key).ok()))
    }

    /// Load config from a specific path, then apply environment fallbacks.
    pub fn load_path(path: &Path) -> Result<Self> {
        Ok(Self::load_from(path)?.resolved(|key| std::env::var(key).ok()))
    }

    /// Parse a config file without touching the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DocAgentError::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| DocAgentError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save config to a path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DocAgentError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill empty secrets from `lookup` (normally the process environment)
    /// and expand `~` in every path.
    pub fn resolved<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |field: &mut String, key: &str| {
            if field.is_empty() {
                if let Some(value) = lookup(key) {
                    *field = value;
                }
            }
        };
        fill(&mut self.openai.api_key, "OPENAI_API_KEY");
        fill(&mut self.index.mongodb_uri, "MONGODB_URI");
        fill(&mut self.box_store.client_id, "BOX_CLIENT_ID");
        fill(&mut self.box_store.client_secret, "BOX_CLIENT_SECRET");
        fill(&mut self.box_store.subject_id, "BOX_SUBJECT_ID");
        if self.openai.base_url == default_openai_base_url() {
            if let Some(url) = lookup("OPENAI_BASE_URL") {
                self.openai.base_url = url;
            }
        }

        self.box_store.token_cache = expand_path(&self.box_store.token_cache);
        self.index.sqlite_path = expand_path(&self.index.sqlite_path);
        self.checkpoint.path = expand_path(&self.checkpoint.path);
        self
    }

    /// Check settings every entry point relies on.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(DocAgentError::Config("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(DocAgentError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.index.dimensions == 0 {
            return Err(DocAgentError::Config("index.dimensions must be > 0".into()));
        }
        if self.index.vector_k == 0 {
            return Err(DocAgentError::Config("index.vector_k must be > 0".into()));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(DocAgentError::Config("agent.max_tool_rounds must be > 0".into()));
        }
        match self.index.backend.as_str() {
            "sqlite" | "atlas" => {}
            other => {
                return Err(DocAgentError::Config(format!("Unknown index backend: {other}")));
            }
        }
        match self.checkpoint.backend.as_str() {
            "sqlite" | "memory" | "atlas" => {}
            other => {
                return Err(DocAgentError::Config(format!("Unknown checkpoint backend: {other}")));
            }
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the DocAgent home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docagent")
    }
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

/// Box (cloud document store) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// User the Client Credentials Grant acts as.
    #[serde(default)]
    pub subject_id: String,
    /// Folder the demo folder is created in ("0" is the root).
    #[serde(default = "default_parent_folder")]
    pub parent_folder_id: String,
    #[serde(default = "default_sample_data_path")]
    pub sample_data_path: String,
    /// Access-token cache file; empty keeps the token in memory only.
    #[serde(default = "default_token_cache")]
    pub token_cache: String,
    #[serde(default = "default_box_api_url")]
    pub api_url: String,
    #[serde(default = "default_box_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_box_auth_url")]
    pub auth_url: String,
}

fn default_parent_folder() -> String { "0".into() }
fn default_sample_data_path() -> String { "sample_data/Q4 Tech earnings-Demo".into() }
fn default_token_cache() -> String { "~/.docagent/box_token.json".into() }
fn default_box_api_url() -> String { "https://api.box.com/2.0".into() }
fn default_box_upload_url() -> String { "https://upload.box.com/api/2.0".into() }
fn default_box_auth_url() -> String { "https://api.box.com/oauth2/token".into() }

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            subject_id: String::new(),
            parent_folder_id: default_parent_folder(),
            sample_data_path: default_sample_data_path(),
            token_cache: default_token_cache(),
            api_url: default_box_api_url(),
            upload_url: default_box_upload_url(),
            auth_url: default_box_auth_url(),
        }
    }
}

/// OpenAI-compatible chat and embeddings configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_chat_model() -> String { "gpt-4o".into() }
fn default_embedding_model() -> String { "text-embedding-ada-002".into() }
fn default_max_tokens() -> u32 { 1024 }
fn default_timeout_secs() -> u64 { 120 }

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Searchable collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "sqlite" (local file) or "atlas" (MongoDB Atlas, `atlas` feature).
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_vector_index")]
    pub vector_index: String,
    #[serde(default = "default_search_index")]
    pub search_index: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default)]
    pub similarity: Similarity,
    #[serde(default = "default_vector_k")]
    pub vector_k: usize,
    #[serde(default = "default_embed_batch")]
    pub embed_batch_size: usize,
}

fn default_index_backend() -> String { "sqlite".into() }
fn default_sqlite_path() -> String { "~/.docagent/index.db".into() }
fn default_database() -> String { "langchain_db".into() }
fn default_collection() -> String { "earnings_reports".into() }
fn default_vector_index() -> String { "vector_index".into() }
fn default_search_index() -> String { "search_index".into() }
fn default_dimensions() -> usize { 1536 }
fn default_vector_k() -> usize { 5 }
fn default_embed_batch() -> usize { 512 }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            sqlite_path: default_sqlite_path(),
            mongodb_uri: String::new(),
            database: default_database(),
            collection: default_collection(),
            vector_index: default_vector_index(),
            search_index: default_search_index(),
            dimensions: default_dimensions(),
            similarity: Similarity::default(),
            vector_k: default_vector_k(),
            embed_batch_size: default_embed_batch(),
        }
    }
}

/// Text splitter configuration (sizes in characters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize { 200 }
fn default_chunk_overlap() -> usize { 20 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool rounds allowed per user turn before a final answer is forced.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Execute the tool calls of one round concurrently.
    #[serde(default)]
    pub parallel_tool_calls: bool,
}

fn default_max_tool_rounds() -> usize { 10 }

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            parallel_tool_calls: false,
        }
    }
}

/// Conversation checkpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// "sqlite", "memory" or "atlas".
    #[serde(default = "default_checkpoint_backend")]
    pub backend: String,
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
    /// Collection used by the "atlas" backend.
    #[serde(default = "default_checkpoint_collection")]
    pub collection: String,
}

fn default_checkpoint_backend() -> String { "sqlite".into() }
fn default_checkpoint_path() -> String { "~/.docagent/checkpoints.db".into() }
fn default_checkpoint_collection() -> String { "checkpoints".into() }

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: default_checkpoint_backend(),
            path: default_checkpoint_path(),
            collection: default_checkpoint_collection(),
        }
    }
}

/// Backoff for calls to Box, OpenAI and the search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 500 }
fn default_max_delay_ms() -> u64 { 8000 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = DocAgentConfig::default();
        assert_eq!(config.openai.chat_model, "gpt-4o");
        assert_eq!(config.index.collection, "earnings_reports");
        assert_eq!(config.index.dimensions, 1536);
        assert_eq!(config.chunking.chunk_size, 200);
        assert_eq!(config.chunking.chunk_overlap, 20);
        assert_eq!(config.agent.max_tool_rounds, 10);
        assert_eq!(config.box_store.parent_folder_id, "0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [box]
            client_id = "abc"
            parent_folder_id = "42"

            [index]
            backend = "atlas"
            similarity = "dotProduct"
            vector_k = 3

            [agent]
            max_tool_rounds = 4
        "#;

        let config: DocAgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.box_store.client_id, "abc");
        assert_eq!(config.box_store.parent_folder_id, "42");
        assert_eq!(config.index.backend, "atlas");
        assert_eq!(config.index.similarity, Similarity::DotProduct);
        assert_eq!(config.index.vector_k, 3);
        assert_eq!(config.agent.max_tool_rounds, 4);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: DocAgentConfig = toml::from_str("").unwrap();
        assert_eq!(config.index.backend, "sqlite");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_env_fallback_only_fills_empty_fields() {
        let env: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("BOX_CLIENT_ID", "env-client"),
            ("MONGODB_URI", "mongodb+srv://env"),
        ]
        .into_iter()
        .collect();

        let mut config = DocAgentConfig::default();
        config.box_store.client_id = "file-client".into();
        let config = config.resolved(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai.api_key, "sk-env");
        assert_eq!(config.box_store.client_id, "file-client");
        assert_eq!(config.index.mongodb_uri, "mongodb+srv://env");
        assert!(config.box_store.client_secret.is_empty());
    }

    #[test]
    fn test_tilde_paths_are_expanded() {
        let config = DocAgentConfig::default().resolved(|_| None);
        assert!(!config.index.sqlite_path.starts_with('~'));
        assert!(config.checkpoint.path.ends_with("checkpoints.db"));
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut config = DocAgentConfig::default();
        config.chunking.chunk_overlap = 200;
        assert!(matches!(config.validate(), Err(DocAgentError::Config(_))));

        let mut config = DocAgentConfig::default();
        config.index.backend = "redis".into();
        assert!(config.validate().is_err());

        let mut config = DocAgentConfig::default();
        config.index.vector_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_text_k_is_ignored() {
        let config: DocAgentConfig = toml::from_str("[index]\ntext_k = 3\nvector_k = 2\n").unwrap();
        assert_eq!(config.index.vector_k, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = DocAgentConfig::default();
        config.openai.chat_model = "gpt-4o-mini".into();
        config.save_to(&path).unwrap();

        let loaded = DocAgentConfig::load_from(&path).unwrap();
        assert_eq!(loaded.openai.chat_model, "gpt-4o-mini");
    }

    #[test]
    fn test_home_dir() {
        let home = DocAgentConfig::home_dir();
        assert!(home.to_string_lossy().contains("docagent"));
    }
}
