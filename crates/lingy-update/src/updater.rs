use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lingy_platform::LocalInstallState;
use log::{info, warn};

use crate::asset::select;
use crate::config::UpdaterConfig;
use crate::download::{ArtifactDownloader, ArtifactFetcher};
use crate::error::{UpdateError, UpdateErrorKind};
use crate::install::{InstallState, Installer, ProcessLauncher, UpdatePlan};
use crate::progress::{ProgressSender, UpdateProgress};
use crate::release::{ReleaseClient, ReleaseSource};
use crate::verify::{ArtifactVerifier, Unverified};
use crate::version::compare;

/// How a single update check ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The registry could not be queried or returned no usable release.
    ReleaseUnavailable { kind: UpdateErrorKind },
    /// The installed version is the latest one, or newer.
    UpToDate { latest: String },
    /// A newer release exists but ships no installable asset.
    NoAsset { version: String },
    /// Control was handed to the helper or installer.
    HandedOff { version: String, state: InstallState },
    /// Installing failed and the current version keeps running.
    InstallFailed { version: String, kind: UpdateErrorKind },
}

impl UpdateOutcome {
    /// `true` once an update has been applied or is in progress.
    #[must_use]
    pub fn update_applied(&self) -> bool {
        matches!(self, Self::HandedOff { .. })
    }
}

/// Runs the check, compare, fetch and install sequence.
///
/// Stages run strictly one after another and none is retried. Callers must
/// not run two checks at once, since both would share the extraction
/// directory.
pub struct Updater {
    releases: Arc<dyn ReleaseSource>,
    artifacts: Arc<dyn ArtifactFetcher>,
    verifier: Arc<dyn ArtifactVerifier>,
    launcher: Arc<dyn ProcessLauncher>,
    extraction_dir: PathBuf,
    helper_delay: Duration,
    progress: ProgressSender,
}

impl Updater {
    /// Build an updater talking to the configured registry. The release
    /// client and the downloader share one HTTP client.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(
        config: &UpdaterConfig,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Result<Self, UpdateError> {
        let releases = ReleaseClient::new(config)?;
        let artifacts =
            ArtifactDownloader::new(releases.http_client().clone(), config.download_dir.clone());
        Ok(Self::from_parts(
            Arc::new(releases),
            Arc::new(artifacts),
            launcher,
            config,
        ))
    }

    #[must_use]
    pub fn from_parts(
        releases: Arc<dyn ReleaseSource>,
        artifacts: Arc<dyn ArtifactFetcher>,
        launcher: Arc<dyn ProcessLauncher>,
        config: &UpdaterConfig,
    ) -> Self {
        Self {
            releases,
            artifacts,
            verifier: Arc::new(Unverified),
            launcher,
            extraction_dir: config.extraction_dir.clone(),
            helper_delay: config.helper_delay,
            progress: ProgressSender::disabled(),
        }
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn ArtifactVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    /// Check `owner/repo` for a release newer than `local_version` and, if
    /// there is one, install it over `app_exe`.
    ///
    /// Returns `true` when an update was handed off.
    ///
    /// # Errors
    /// See [`Updater::run`].
    pub async fn check_and_update(
        &self,
        owner: &str,
        repo: &str,
        local_version: &str,
        app_exe: &Path,
    ) -> Result<bool, UpdateError> {
        self.run(owner, repo, local_version, app_exe)
            .await
            .map(|outcome| outcome.update_applied())
    }

    /// [`Updater::check_and_update`] driven by the local install record.
    ///
    /// Without a record the application is not installed and nothing is
    /// queried. The executable is `executable_name` inside the recorded
    /// install directory.
    ///
    /// # Errors
    /// See [`Updater::run`].
    pub async fn check_installed(
        &self,
        owner: &str,
        repo: &str,
        install: Option<&LocalInstallState>,
        executable_name: &str,
    ) -> Result<bool, UpdateError> {
        let Some(install) = install else {
            info!("Lingy is not installed, skipping update check");
            return Ok(false);
        };
        let app_exe = install.install_path.join(executable_name);
        self.check_and_update(owner, repo, &install.current_version, &app_exe)
            .await
    }

    /// Run the pipeline and report how it ended.
    ///
    /// Registry failures, an up-to-date install, a missing asset and install
    /// failures are outcomes, not errors.
    ///
    /// # Errors
    /// Returns an error when either version is malformed, when the download
    /// fails, or when the downloaded artifact fails verification.
    pub async fn run(
        &self,
        owner: &str,
        repo: &str,
        local_version: &str,
        app_exe: &Path,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.progress.send(UpdateProgress::Checking);
        info!("Checking for updates to {owner}/{repo} (installed {local_version})");

        let release = match self.releases.fetch_latest(owner, repo).await {
            Ok(release) => release,
            Err(error) => {
                warn!("Could not retrieve release data: {error}");
                return Ok(UpdateOutcome::ReleaseUnavailable { kind: error.kind() });
            }
        };

        if !compare(local_version, &release.tag)?.is_newer() {
            info!("No update needed, latest release is {}", release.tag);
            return Ok(UpdateOutcome::UpToDate {
                latest: release.tag,
            });
        }

        info!("Found new version {} ({})", release.tag, release.title());
        self.progress.send(UpdateProgress::UpdateAvailable {
            version: release.tag.clone(),
        });

        let selection = match select(&release.assets) {
            Ok(selection) => selection,
            Err(error) => {
                warn!("Update asset not found: {error}");
                return Ok(UpdateOutcome::NoAsset {
                    version: release.tag,
                });
            }
        };

        info!("Downloading {}...", selection.asset.name);
        let local_path = self
            .artifacts
            .download(selection.asset, &self.progress)
            .await?;

        self.progress.send(UpdateProgress::Verifying);
        let plan = UpdatePlan {
            asset: selection.asset.clone(),
            local_path,
            kind: selection.kind,
        };
        self.verify(&plan).await?;

        let mut installer = Installer::new(
            self.launcher.clone(),
            self.extraction_dir.clone(),
            self.helper_delay,
        )
        .with_progress(self.progress.clone());

        match installer.apply(&plan, app_exe).await {
            Ok(state) => Ok(UpdateOutcome::HandedOff {
                version: release.tag,
                state,
            }),
            Err(error) => Ok(UpdateOutcome::InstallFailed {
                version: release.tag,
                kind: error.kind(),
            }),
        }
    }

    /// A rejected artifact is deleted so nothing installs it later.
    async fn verify(&self, plan: &UpdatePlan) -> Result<(), UpdateError> {
        let verifier = self.verifier.clone();
        let asset = plan.asset.clone();
        let path = plan.local_path.clone();

        let result = tokio::task::spawn_blocking(move || verifier.verify(&asset, &path))
            .await
            .map_err(|error| {
                UpdateError::io("verification task failed", std::io::Error::other(error))
            })?;

        if let Err(error) = result {
            warn!("Discarding {}: {error}", plan.local_path.display());
            if let Err(remove_error) = tokio::fs::remove_file(&plan.local_path).await {
                warn!("Failed to remove rejected artifact: {remove_error}");
            }
            return Err(error);
        }
        Ok(())
    }
}
