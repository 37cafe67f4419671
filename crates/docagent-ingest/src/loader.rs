//! Load the text of every file in a remote folder.

use docagent_core::error::Result;
use docagent_core::traits::store::{DocumentStore, ItemKind};
use docagent_core::types::ChunkMetadata;
use serde::{Deserialize, Serialize};

/// Full text of one remote file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadedDocument {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Load every file directly inside `folder_id`. Subfolders are not descended
/// into; files without extractable text are skipped.
pub async fn load_documents(store: &dyn DocumentStore, folder_id: &str) -> Result<Vec<LoadedDocument>> {
    let items = store.list_items(folder_id).await?;
    let mut docs = Vec::new();

    for item in items.into_iter().filter(|i| i.kind == ItemKind::File) {
        match store.read_text(&item.id).await? {
            Some(text) => {
                tracing::debug!("📄 Loaded {} ({} chars)", item.name, text.chars().count());
                docs.push(LoadedDocument {
                    text,
                    metadata: ChunkMetadata {
                        title: item.name,
                        source: store.file_url(&item.id),
                        extra: Default::default(),
                    },
                });
            }
            None => tracing::warn!("⚠️ Skipping {}: no text content", item.name),
        }
    }

    tracing::info!("📚 Loaded {} documents from {} folder {folder_id}", docs.len(), store.name());
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn test_load_sets_title_and_source() {
        let store = MemoryStore::new();
        let folder = store.create_folder("reports", "0").await.unwrap();
        let file = store
            .upload_file(&folder.id, "nvidia.txt", b"Data center revenue rose".to_vec())
            .await
            .unwrap();
        store.create_folder("nested", &folder.id).await.unwrap();

        let docs = load_documents(&store, &folder.id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Data center revenue rose");
        assert_eq!(docs[0].metadata.title, "nvidia.txt");
        assert_eq!(docs[0].metadata.source, format!("memory://file/{}", file.id));
    }

    #[tokio::test]
    async fn test_binary_files_are_skipped() {
        let store = MemoryStore::new();
        let folder = store.create_folder("reports", "0").await.unwrap();
        store
            .upload_file(&folder.id, "scan.bin", vec![0xff, 0xfe, 0x00])
            .await
            .unwrap();
        let docs = load_documents(&store, &folder.id).await.unwrap();
        assert!(docs.is_empty());
    }
}
