//! # DocAgent Ingest
//!
//! Upload sample documents to the remote store, load them back as text and
//! split them into overlapping chunks.

pub mod loader;
pub mod splitter;
pub mod upload;

#[cfg(test)]
mod testing;

pub use loader::{LoadedDocument, load_documents};
pub use splitter::RecursiveTextSplitter;
pub use upload::{UploadReport, upload_folder};
