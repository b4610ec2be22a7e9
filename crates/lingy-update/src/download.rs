use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;

use crate::error::UpdateError;
use crate::progress::{ProgressSender, UpdateProgress};
use crate::release::AssetInfo;

const FALLBACK_FILE_NAME: &str = "update-download";

#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Transfer `asset` to local storage and return the written file.
    ///
    /// On failure no file is left at the returned location.
    async fn download(
        &self,
        asset: &AssetInfo,
        progress: &ProgressSender,
    ) -> Result<PathBuf, UpdateError>;
}

/// Streams release assets into a download directory.
///
/// The body is written to a hidden temp file next to the destination and
/// renamed into place only once it is complete and synced, so callers see
/// either the whole artifact or nothing.
#[derive(Debug, Clone)]
pub struct ArtifactDownloader {
    http: reqwest::Client,
    dest_dir: PathBuf,
}

impl ArtifactDownloader {
    #[must_use]
    pub fn new(http: reqwest::Client, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dest_dir: dest_dir.into(),
        }
    }

    #[must_use]
    pub fn destination_for(&self, asset: &AssetInfo) -> PathBuf {
        self.dest_dir.join(local_file_name(&asset.name))
    }
}

#[async_trait]
impl ArtifactFetcher for ArtifactDownloader {
    async fn download(
        &self,
        asset: &AssetInfo,
        progress: &ProgressSender,
    ) -> Result<PathBuf, UpdateError> {
        let dest = self.destination_for(asset);
        info!("Downloading {} from {}", asset.name, asset.download_url);

        let response = self
            .http
            .get(&asset.download_url)
            .send()
            .await
            .map_err(|error| UpdateError::transport("download request failed", error))?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                context: "download",
                url: asset.download_url.clone(),
                status: response.status(),
            });
        }

        let total = response.content_length().or(asset.size).unwrap_or(0);

        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(|error| {
                UpdateError::io_with_path("failed to create download directory", &self.dest_dir, &error)
            })?;
        let staging = tempfile::Builder::new()
            .prefix(".lingy-download-")
            .tempfile_in(&self.dest_dir)
            .map_err(|error| {
                UpdateError::io_with_path("failed to create download file", &self.dest_dir, &error)
            })?;
        let handle = staging.as_file().try_clone().map_err(|error| {
            UpdateError::io_with_path("failed to open download file", staging.path(), &error)
        })?;
        let mut file = tokio::fs::File::from_std(handle);

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|error| UpdateError::transport("download stream error", error))?;
            file.write_all(&chunk).await.map_err(|error| {
                UpdateError::io_with_path("failed to write download data", staging.path(), &error)
            })?;
            downloaded += chunk.len() as u64;
            progress.send(UpdateProgress::Downloading { downloaded, total });
        }

        file.flush().await.map_err(|error| {
            UpdateError::io_with_path("failed to flush download file", staging.path(), &error)
        })?;
        file.sync_all().await.map_err(|error| {
            UpdateError::io_with_path("failed to sync download file", staging.path(), &error)
        })?;
        drop(file);

        persist(staging, &dest)?;
        info!("Download complete: {downloaded} bytes to {}", dest.display());
        Ok(dest)
    }
}

fn persist(staging: tempfile::NamedTempFile, dest: &Path) -> Result<(), UpdateError> {
    if dest.exists() {
        debug!("Replacing previous download at {}", dest.display());
    }
    staging.persist(dest).map_err(|error| {
        UpdateError::io_with_path("failed to move download into place", dest, &error.error)
    })?;
    Ok(())
}

/// Reduce an asset name to a bare file name safe to join onto a directory.
fn local_file_name(raw: &str) -> &str {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| *name == raw && *name != "..")
        .unwrap_or(FALLBACK_FILE_NAME)
}
