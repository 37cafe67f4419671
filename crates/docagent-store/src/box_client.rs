//! Box REST client implementing [`DocumentStore`].

use async_trait::async_trait;
use docagent_core::config::{BoxConfig, DocAgentConfig};
use docagent_core::error::{DocAgentError, Result};
use docagent_core::retry::{RetryPolicy, retry};
use docagent_core::traits::store::{
    DocumentStore, FileInfo, FolderInfo, StoreItem, StoreUser,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::auth::CcgAuth;

const PAGE_LIMIT: usize = 1000;
const FILE_WEB_URL: &str = "https://app.box.com/file";
/// Polls of a pending text representation before falling back to raw content.
const REPRESENTATION_POLLS: u32 = 5;

pub struct BoxClient {
    api_url: String,
    upload_url: String,
    auth: CcgAuth,
    retry: RetryPolicy,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ItemsPage {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    entries: Vec<StoreItem>,
}

#[derive(Deserialize)]
struct UploadResponse {
    entries: Vec<FileInfo>,
}

/// State of the `extracted_text` representation of a file.
#[derive(Debug, PartialEq)]
pub(crate) enum TextRepresentation {
    /// Ready; content lives at this URL.
    Ready(String),
    /// Being generated; `info_url` reports progress.
    Pending { info_url: Option<String> },
    /// Box cannot extract text from this file.
    Unavailable,
}

impl BoxClient {
    pub fn new(config: &DocAgentConfig) -> Result<Self> {
        Self::with_box_config(&config.box_store, RetryPolicy::from(&config.retry))
    }

    pub fn with_box_config(config: &BoxConfig, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DocAgentError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            auth: CcgAuth::new(config),
            retry,
            http,
        })
    }

    /// One authenticated request. `build` is called per attempt.
    async fn send_once<F>(&self, build: &F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let token = self.auth.access_token(&self.http).await?;
        let resp = build(&self.http)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DocAgentError::Http(format!("Box request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status.as_u16() == 401 {
            self.auth.invalidate().await;
        }
        let body = resp.text().await.unwrap_or_default();
        Err(parse_box_error(status.as_u16(), &body))
    }

    async fn send<F>(&self, label: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        retry(&self.retry, label, || self.send_once(&build)).await
    }

    async fn send_json<F>(&self, label: &str, build: F) -> Result<Value>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.send(label, build)
            .await?
            .json()
            .await
            .map_err(|e| DocAgentError::Http(format!("Invalid Box response for {label}: {e}")))
    }

    async fn text_representation(&self, file_id: &str) -> Result<TextRepresentation> {
        let url = format!("{}/files/{file_id}", self.api_url);
        let body = self
            .send_json("box get representations", |http| {
                http.get(&url)
                    .query(&[("fields", "representations")])
                    .header("x-rep-hints", "[extracted_text]")
            })
            .await?;
        Ok(parse_text_representation(&body))
    }

    async fn download_text(&self, url: &str) -> Result<Option<String>> {
        let bytes = self
            .send("box download", |http| http.get(url))
            .await?
            .bytes()
            .await
            .map_err(|e| DocAgentError::Http(format!("Box download failed: {e}")))?;
        Ok(String::from_utf8(bytes.to_vec()).ok())
    }
}

/// Convert a Box error body into `DocAgentError::Api`, keeping the ids of
/// conflicting items (`context_info.conflicts` is an array for folders and a
/// single object for files).
pub fn parse_box_error(status: u16, body: &str) -> DocAgentError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = parsed["message"]
        .as_str()
        .or_else(|| parsed["error_description"].as_str())
        .map(String::from)
        .unwrap_or_else(|| body.to_string());
    let code = parsed["code"]
        .as_str()
        .or_else(|| parsed["error"].as_str())
        .map(String::from);

    let conflicts = match &parsed["context_info"]["conflicts"] {
        Value::Array(items) => items
            .iter()
            .filter_map(|c| c["id"].as_str().map(String::from))
            .collect(),
        Value::Object(item) => item
            .get("id")
            .and_then(Value::as_str)
            .map(|id| vec![id.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    DocAgentError::Api {
        service: "box".to_string(),
        status: parsed["status"].as_u64().map(|s| s as u16).unwrap_or(status),
        code,
        message,
        conflicts,
    }
}

pub(crate) fn parse_text_representation(body: &Value) -> TextRepresentation {
    let Some(entry) = body["representations"]["entries"]
        .as_array()
        .and_then(|entries| {
            entries
                .iter()
                .find(|e| e["representation"].as_str() == Some("extracted_text"))
        })
    else {
        return TextRepresentation::Unavailable;
    };

    match entry["status"]["state"].as_str() {
        Some("success") | Some("viewable") => entry["content"]["url_template"]
            .as_str()
            .map(|t| TextRepresentation::Ready(t.replace("{+asset_path}", "")))
            .unwrap_or(TextRepresentation::Unavailable),
        Some("pending") | Some("none") => TextRepresentation::Pending {
            info_url: entry["info"]["url"].as_str().map(String::from),
        },
        _ => TextRepresentation::Unavailable,
    }
}

#[async_trait]
impl DocumentStore for BoxClient {
    async fn current_user(&self) -> Result<StoreUser> {
        let url = format!("{}/users/me", self.api_url);
        let body = self.send_json("box users/me", |http| http.get(&url)).await?;
        Ok(StoreUser {
            id: body["id"].as_str().unwrap_or_default().to_string(),
            name: body["name"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderInfo> {
        let url = format!("{}/folders", self.api_url);
        let payload = json!({ "name": name, "parent": { "id": parent_id } });
        let body = self
            .send_json("box create folder", |http| http.post(&url).json(&payload))
            .await?;
        serde_json::from_value(body).map_err(DocAgentError::from)
    }

    async fn get_folder(&self, folder_id: &str) -> Result<FolderInfo> {
        let url = format!("{}/folders/{folder_id}", self.api_url);
        let body = self
            .send_json("box get folder", |http| {
                http.get(&url).query(&[("fields", "id,name")])
            })
            .await?;
        serde_json::from_value(body).map_err(DocAgentError::from)
    }

    async fn list_items(&self, folder_id: &str) -> Result<Vec<StoreItem>> {
        let url = format!("{}/folders/{folder_id}/items", self.api_url);
        let mut items = Vec::new();
        let mut offset = 0usize;
        loop {
            let query = [
                ("fields", "id,type,name".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
            ];
            let body = self
                .send_json("box list items", |http| http.get(&url).query(&query))
                .await?;
            let page: ItemsPage = serde_json::from_value(body)?;
            let fetched = page.entries.len();
            items.extend(page.entries);
            offset += fetched;
            if fetched == 0 || offset >= page.total_count {
                break;
            }
        }
        tracing::debug!("📂 Box folder {folder_id}: {} items", items.len());
        Ok(items)
    }

    async fn upload_file(&self, folder_id: &str, name: &str, data: Vec<u8>) -> Result<FileInfo> {
        let url = format!("{}/files/content", self.upload_url);
        let attributes = json!({ "name": name, "parent": { "id": folder_id } }).to_string();
        let file_name = name.to_string();
        let body = self
            .send_json("box upload", |http| {
                let form = reqwest::multipart::Form::new()
                    .text("attributes", attributes.clone())
                    .part(
                        "file",
                        reqwest::multipart::Part::bytes(data.clone()).file_name(file_name.clone()),
                    );
                http.post(&url).multipart(form)
            })
            .await?;
        let upload: UploadResponse = serde_json::from_value(body)?;
        upload
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| DocAgentError::api("box", 500, "Upload returned no file entry"))
    }

    async fn read_text(&self, file_id: &str) -> Result<Option<String>> {
        let mut polls = 0;
        loop {
            match self.text_representation(file_id).await? {
                TextRepresentation::Ready(url) => return self.download_text(&url).await,
                TextRepresentation::Pending { info_url } if polls < REPRESENTATION_POLLS => {
                    // Fetching the info URL asks Box to start generating the text.
                    if let Some(info) = info_url {
                        let _ = self.send("box representation info", |http| http.get(&info)).await;
                    }
                    polls += 1;
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                _ => break,
            }
        }

        let url = format!("{}/files/{file_id}/content", self.api_url);
        let text = self.download_text(&url).await?;
        if text.is_none() {
            tracing::warn!("⚠️ Box file {file_id}: no extractable text, skipping");
        }
        Ok(text)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{FILE_WEB_URL}/{file_id}")
    }

    fn name(&self) -> &str {
        "box"
    }
}
