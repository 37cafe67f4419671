//! Remote folder/file store trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Authenticated account the store acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
    #[serde(other)]
    Other,
}

/// Entry of a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: String,
    pub name: String,
}

/// Cloud document storage.
///
/// Name clashes are reported as `DocAgentError::Api` with status 409 and the
/// id of the existing item in `conflicts`; callers rely on that instead of
/// checking for existence first.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn current_user(&self) -> Result<StoreUser>;

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderInfo>;

    async fn get_folder(&self, folder_id: &str) -> Result<FolderInfo>;

    /// Every item directly inside `folder_id`.
    async fn list_items(&self, folder_id: &str) -> Result<Vec<StoreItem>>;

    async fn upload_file(&self, folder_id: &str, name: &str, data: Vec<u8>) -> Result<FileInfo>;

    /// Plain-text content of a file, or `None` when no text can be extracted.
    async fn read_text(&self, file_id: &str) -> Result<Option<String>>;

    /// Web link for a file, used as the chunk `source`.
    fn file_url(&self, file_id: &str) -> String;

    fn name(&self) -> &str;
}
