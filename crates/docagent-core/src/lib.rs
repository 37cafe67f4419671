//! # DocAgent Core
//!
//! Shared types, service traits, configuration and errors for the DocAgent
//! earnings-report assistant.

pub mod config;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use config::DocAgentConfig;
pub use error::{DocAgentError, OrchestrationError, Result};
pub use retry::{RetryPolicy, retry};
