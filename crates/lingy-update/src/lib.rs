//! Self-update pipeline for the Lingy desktop app.
//!
//! One [`Updater::check_and_update`] call runs the whole sequence:
//! - fetch the latest release from the registry ([`ReleaseClient`]),
//! - compare it with the installed version ([`compare`]),
//! - pick the artifact to install ([`select`]),
//! - download it to local storage ([`ArtifactDownloader`]),
//! - swap or launch it and hand off to the new version ([`Installer`]).
//!
//! Every stage sits behind a trait so hosts and tests can replace the
//! network or process boundary.

mod asset;
mod config;
mod download;
mod error;
mod extract;
mod install;
mod progress;
mod release;
mod updater;
mod verify;
mod version;

pub use asset::{AssetKind, Selection, select};
pub use config::{
    DEFAULT_API_BASE, DEFAULT_HELPER_DELAY, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, UpdaterConfig,
};
pub use download::{ArtifactDownloader, ArtifactFetcher};
pub use error::{UpdateError, UpdateErrorKind};
pub use extract::{ExtractSummary, extract_zip};
pub use install::{
    HelperCommand, InstallState, Installer, LaunchRequest, ProcessLauncher, SystemLauncher,
    UpdatePlan,
};
pub use lingy_platform::LocalInstallState;
pub use progress::{ProgressSender, UpdateProgress};
pub use release::{AssetInfo, ReleaseClient, ReleaseInfo, ReleaseSource};
pub use updater::{UpdateOutcome, Updater};
pub use verify::{ArtifactVerifier, Sha256Digest, Unverified};
pub use version::{VersionOrdering, VersionParseError, compare};
