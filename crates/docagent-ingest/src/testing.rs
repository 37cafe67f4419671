//! In-memory document store used by the ingestion tests.

use async_trait::async_trait;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::store::{
    DocumentStore, FileInfo, FolderInfo, ItemKind, StoreItem, StoreUser,
};
use std::sync::Mutex;

struct Node {
    item: StoreItem,
    parent: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    next_id: u64,
    fail_folder: Option<u16>,
}

/// Behaves like Box for name clashes: 409 with the existing item's id.
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        }
    }

    /// Make the next `create_folder` fail with `status`.
    pub fn fail_next_folder(&self, status: u16) {
        self.state.lock().unwrap().fail_folder = Some(status);
    }

    fn conflict(id: &str) -> DocAgentError {
        DocAgentError::Api {
            service: "memory".into(),
            status: 409,
            code: Some("item_name_in_use".into()),
            message: "Item with the same name already exists".into(),
            conflicts: vec![id.to_string()],
        }
    }

    fn insert(&self, kind: ItemKind, parent: &str, name: &str, data: Vec<u8>) -> Result<StoreItem> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .nodes
            .iter()
            .find(|n| n.parent == parent && n.item.name == name)
        {
            return Err(Self::conflict(&existing.item.id));
        }
        state.next_id += 1;
        let item = StoreItem {
            kind,
            id: state.next_id.to_string(),
            name: name.to_string(),
        };
        state.nodes.push(Node {
            item: item.clone(),
            parent: parent.to_string(),
            data,
        });
        Ok(item)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn current_user(&self) -> Result<StoreUser> {
        Ok(StoreUser {
            id: "1".into(),
            name: "Test User".into(),
        })
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderInfo> {
        if let Some(status) = self.state.lock().unwrap().fail_folder.take() {
            return Err(DocAgentError::api("memory", status, "forbidden"));
        }
        let item = self.insert(ItemKind::Folder, parent_id, name, Vec::new())?;
        Ok(FolderInfo {
            id: item.id,
            name: item.name,
        })
    }

    async fn get_folder(&self, folder_id: &str) -> Result<FolderInfo> {
        let state = self.state.lock().unwrap();
        state
            .nodes
            .iter()
            .find(|n| n.item.id == folder_id && n.item.kind == ItemKind::Folder)
            .map(|n| FolderInfo {
                id: n.item.id.clone(),
                name: n.item.name.clone(),
            })
            .ok_or_else(|| DocAgentError::api("memory", 404, "not found"))
    }

    async fn list_items(&self, folder_id: &str) -> Result<Vec<StoreItem>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .iter()
            .filter(|n| n.parent == folder_id)
            .map(|n| n.item.clone())
            .collect())
    }

    async fn upload_file(&self, folder_id: &str, name: &str, data: Vec<u8>) -> Result<FileInfo> {
        let item = self.insert(ItemKind::File, folder_id, name, data)?;
        Ok(FileInfo {
            id: item.id,
            name: item.name,
        })
    }

    async fn read_text(&self, file_id: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let node = state
            .nodes
            .iter()
            .find(|n| n.item.id == file_id)
            .ok_or_else(|| DocAgentError::api("memory", 404, "not found"))?;
        Ok(String::from_utf8(node.data.clone()).ok())
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("memory://file/{file_id}")
    }

    fn name(&self) -> &str {
        "memory"
    }
}
