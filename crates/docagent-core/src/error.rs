//! DocAgent error types.

use thiserror::Error;

/// Result alias used across every DocAgent crate.
pub type Result<T> = std::result::Result<T, DocAgentError>;

#[derive(Debug, Error)]
pub enum DocAgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key missing for {0}")]
    ApiKeyMissing(String),

    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Structured error returned by a remote service.
    #[error("{service} API error {status}: {message}")]
    Api {
        service: String,
        status: u16,
        code: Option<String>,
        message: String,
        /// Ids of the items that caused a 409, when the service reports them.
        conflicts: Vec<String>,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search backend error: {0}")]
    Search(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures of the agent/tools graph itself.
#[derive(Debug, Error, PartialEq)]
pub enum OrchestrationError {
    #[error("Unknown tool requested: {0}")]
    UnknownTool(String),

    #[error("No messages found in state for thread '{0}'")]
    EmptyState(String),

    #[error("Tool round limit ({0}) reached without a final answer")]
    ToolRoundLimit(usize),

    #[error("Thread '{thread_id}' has an unfinished turn pending at node '{node}'; resume or reset it first")]
    Interrupted { thread_id: String, node: String },

    #[error("Thread '{0}' has nothing to resume")]
    NothingToResume(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },
}

impl DocAgentError {
    /// Build an `Api` error without conflict details.
    pub fn api(service: &str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.to_string(),
            status,
            code: None,
            message: message.into(),
            conflicts: Vec::new(),
        }
    }

    /// HTTP status carried by the error, if it came from a remote service.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for "item already exists" responses (HTTP 409).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Id of the first conflicting item reported with a 409.
    pub fn conflict_id(&self) -> Option<&str> {
        match self {
            Self::Api {
                status: 409,
                conflicts,
                ..
            } => conflicts.first().map(String::as_str),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        let err = DocAgentError::Api {
            service: "box".into(),
            status: 409,
            code: Some("item_name_in_use".into()),
            message: "Item with the same name already exists".into(),
            conflicts: vec!["12345".into()],
        };
        assert!(err.is_conflict());
        assert_eq!(err.conflict_id(), Some("12345"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(DocAgentError::Http("connection reset".into()).is_transient());
        assert!(DocAgentError::api("openai", 429, "rate limited").is_transient());
        assert!(DocAgentError::api("openai", 503, "unavailable").is_transient());
        assert!(!DocAgentError::api("openai", 401, "bad key").is_transient());
        assert!(!DocAgentError::Config("x".into()).is_transient());
    }

    #[test]
    fn test_orchestration_error_wraps() {
        let err: DocAgentError = OrchestrationError::UnknownTool("web_search".into()).into();
        assert_eq!(err.to_string(), "Unknown tool requested: web_search");
        assert!(err.conflict_id().is_none());
    }
}
