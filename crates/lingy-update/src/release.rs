use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::config::UpdaterConfig;
use crate::error::UpdateError;

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digest: Option<String>,
}

/// Latest-release metadata as published by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(rename = "name", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
    #[serde(rename = "prerelease", default)]
    pub is_prerelease: bool,
    #[serde(rename = "draft", default)]
    pub is_draft: bool,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ReleaseInfo {
    /// Human-readable release name, falling back to the tag.
    #[must_use]
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.tag)
    }
}

#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch metadata for the latest published release of `owner/repo`.
    async fn fetch_latest(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, UpdateError>;
}

/// Registry client for the GitHub-style `releases/latest` endpoint.
///
/// The underlying `reqwest::Client` is cheap to clone and is shared with the
/// artifact downloader.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    api_base: String,
}

impl ReleaseClient {
    /// Build a client with the configured timeout and user agent.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| UpdateError::transport("failed to build HTTP client", error))?;
        Ok(Self::with_http_client(http, &config.api_base))
    }

    #[must_use]
    pub fn with_http_client(http: reqwest::Client, api_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn latest_release_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/releases/latest", self.api_base)
    }
}

#[async_trait]
impl ReleaseSource for ReleaseClient {
    async fn fetch_latest(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, UpdateError> {
        let url = self.latest_release_url(owner, repo);
        debug!("Requesting latest release from {url}");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|error| UpdateError::transport("release request failed", error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::NotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| UpdateError::transport("failed to read release response", error))?;
        let release = parse_release(&body)?;

        info!(
            "Latest release of {owner}/{repo}: {} ({} assets{})",
            release.tag,
            release.assets.len(),
            release
                .published_at
                .map(|at| format!(", published {}", at.format("%Y-%m-%d")))
                .unwrap_or_default()
        );
        Ok(release)
    }
}

/// Deserialize a registry response, matching field names case-insensitively.
///
/// # Errors
/// Returns an error when the body is not JSON or lacks required fields.
pub(crate) fn parse_release(body: &[u8]) -> Result<ReleaseInfo, UpdateError> {
    let value: Value = serde_json::from_slice(body).map_err(UpdateError::Deserialization)?;
    serde_json::from_value(lowercase_keys(value)).map_err(UpdateError::Deserialization)
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
