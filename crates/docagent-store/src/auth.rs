//! Box Client Credentials Grant authentication with token caching.

use chrono::{DateTime, Duration, Utc};
use docagent_core::config::BoxConfig;
use docagent_core::error::{DocAgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Refresh this long before the server-side expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

pub struct CcgAuth {
    client_id: String,
    client_secret: String,
    subject_id: String,
    auth_url: String,
    /// JSON token file; `None` keeps the token in memory only.
    cache_path: Option<PathBuf>,
    token: Mutex<Option<CachedToken>>,
}

impl CcgAuth {
    pub fn new(config: &BoxConfig) -> Self {
        let cache_path = if config.token_cache.is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.token_cache))
        };
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            subject_id: config.subject_id.clone(),
            auth_url: config.auth_url.clone(),
            cache_path,
            token: Mutex::new(None),
        }
    }

    /// A valid access token, fetching a new one when the cached token is stale.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        let mut guard = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        if let Some(token) = self.read_cache().await.filter(|t| t.is_fresh(now)) {
            tracing::debug!("🔑 Using cached Box token");
            let access = token.access_token.clone();
            *guard = Some(token);
            return Ok(access);
        }

        let token = self.request_token(http).await?;
        self.write_cache(&token).await;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    /// Forget the current token (after a 401).
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
        if let Some(path) = &self.cache_path {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    async fn request_token(&self, http: &reqwest::Client) -> Result<CachedToken> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(DocAgentError::ApiKeyMissing("box".into()));
        }
        if self.subject_id.is_empty() {
            return Err(DocAgentError::Config(
                "box.subject_id (BOX_SUBJECT_ID) is required for CCG auth".into(),
            ));
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("box_subject_type", "user"),
            ("box_subject_id", self.subject_id.as_str()),
        ];
        let resp = http
            .post(&self.auth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| DocAgentError::Http(format!("Box token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(crate::box_client::parse_box_error(status.as_u16(), &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| DocAgentError::Http(format!("Invalid Box token response: {e}")))?;
        tracing::info!("🔑 Obtained Box access token (expires in {}s)", token.expires_in);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    async fn read_cache(&self) -> Option<CachedToken> {
        let path = self.cache_path.as_ref()?;
        let content = tokio::fs::read_to_string(path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn write_cache(&self, token: &CachedToken) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        match serde_json::to_string(token) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(path, json).await {
                    tracing::warn!("⚠️ Could not write Box token cache {}: {e}", path.display());
                }
            }
            Err(e) => tracing::warn!("⚠️ Could not serialize Box token: {e}"),
        }
    }
}
