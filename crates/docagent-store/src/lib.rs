//! # DocAgent Store
//!
//! Box cloud storage: Client Credentials Grant auth, folders, uploads and
//! text extraction behind the [`DocumentStore`](docagent_core::traits::DocumentStore) trait.

pub mod auth;
pub mod box_client;

pub use auth::{CachedToken, CcgAuth};
pub use box_client::{BoxClient, parse_box_error};
