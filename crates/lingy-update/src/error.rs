use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::version::VersionParseError;

/// Failure classes reported by the update pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    Transport,
    NotFound,
    Deserialization,
    Parse,
    NoAssetFound,
    Filesystem,
    ProcessSpawn,
    Verification,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{context} failed with HTTP {status} for {url}")]
    HttpStatus {
        context: &'static str,
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("no release published for {owner}/{repo} (HTTP {status})")]
    NotFound {
        owner: String,
        repo: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to parse release data: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] VersionParseError),
    #[error("no update asset found among {count} release assets")]
    NoAssetFound { count: usize },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{name} not found in extracted update at {}", dir.display())]
    MissingExecutable { name: String, dir: PathBuf },
    #[error("failed to spawn {program}: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} failed verification: {details}")]
    Verification { name: String, details: String },
}

impl UpdateError {
    pub(crate) fn transport(context: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { context, source }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }

    pub(crate) fn io_with_path(
        context: &'static str,
        path: &Path,
        source: &std::io::Error,
    ) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }

    pub(crate) fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessSpawn {
            program: program.into(),
            source,
        }
    }

    pub(crate) fn verification(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Verification {
            name: name.into(),
            details: details.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            Self::Transport { .. } | Self::HttpStatus { .. } => UpdateErrorKind::Transport,
            Self::NotFound { .. } => UpdateErrorKind::NotFound,
            Self::Deserialization(_) => UpdateErrorKind::Deserialization,
            Self::Parse(_) => UpdateErrorKind::Parse,
            Self::NoAssetFound { .. } => UpdateErrorKind::NoAssetFound,
            Self::Io { .. } | Self::Zip { .. } | Self::MissingExecutable { .. } => {
                UpdateErrorKind::Filesystem
            }
            Self::ProcessSpawn { .. } => UpdateErrorKind::ProcessSpawn,
            Self::Verification { .. } => UpdateErrorKind::Verification,
        }
    }
}
