//! Service seams. Every external collaborator sits behind one of these traits
//! so components can be wired with real clients or in-process fakes.

pub mod checkpoint;
pub mod embedding;
pub mod provider;
pub mod search;
pub mod store;
pub mod tool;

pub use checkpoint::{Checkpoint, Checkpointer, GraphNode};
pub use embedding::EmbeddingProvider;
pub use provider::{ChatProvider, GenerateParams};
pub use search::{SearchBackend, Similarity, TextIndexSpec, VectorIndexSpec};
pub use store::{DocumentStore, FileInfo, FolderInfo, ItemKind, StoreItem, StoreUser};
pub use tool::Tool;
