//! Idempotent upload of a local directory into the remote store.

use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::store::{DocumentStore, FileInfo, FolderInfo};
use std::path::Path;
use walkdir::WalkDir;

/// Outcome of [`upload_folder`].
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub folder: FolderInfo,
    pub uploaded: Vec<FileInfo>,
    /// Files that already existed remotely (id of the existing file).
    pub skipped: Vec<FileInfo>,
    /// File name and error for uploads that failed for another reason.
    pub failed: Vec<(String, String)>,
}

/// Create (or reuse) a folder named after `local_path` under `parent_id`
/// and upload every file below `local_path` into it.
///
/// Name conflicts are resolved from the 409 response: the folder is reused
/// and existing files are skipped. Any other folder error is returned; other
/// per-file errors are logged and recorded in the report.
pub async fn upload_folder(
    store: &dyn DocumentStore,
    parent_id: &str,
    local_path: &Path,
) -> Result<UploadReport> {
    if !local_path.is_dir() {
        return Err(DocAgentError::Config(format!(
            "Sample data folder not found: {}",
            local_path.display()
        )));
    }
    let folder_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| DocAgentError::Config(format!("Invalid folder path: {}", local_path.display())))?;

    let folder = match store.create_folder(&folder_name, parent_id).await {
        Ok(folder) => folder,
        Err(e) if e.is_conflict() => {
            let existing = e.conflict_id().ok_or_else(|| {
                DocAgentError::Other(format!("Folder '{folder_name}' exists but its id was not reported"))
            })?;
            tracing::info!("📁 Folder '{folder_name}' already exists ({existing}), reusing it");
            store.get_folder(existing).await?
        }
        Err(e) => return Err(e),
    };

    let mut report = UploadReport {
        folder,
        uploaded: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };

    let files = WalkDir::new(local_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());

    for entry in files {
        let name = entry.file_name().to_string_lossy().to_string();
        let data = match tokio::fs::read(entry.path()).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("⚠️ Cannot read {}: {e}", entry.path().display());
                report.failed.push((name, e.to_string()));
                continue;
            }
        };

        match store.upload_file(&report.folder.id, &name, data).await {
            Ok(file) => {
                tracing::info!("⬆️ Uploaded {} ({})", file.name, file.id);
                report.uploaded.push(file);
            }
            Err(e) if e.is_conflict() => {
                let id = e.conflict_id().unwrap_or_default().to_string();
                tracing::info!("⏭️ File already exists: {name} ({id})");
                report.skipped.push(FileInfo { id, name });
            }
            Err(e) => {
                tracing::warn!("⚠️ Upload of {name} failed: {e}");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    Ok(report)
}
