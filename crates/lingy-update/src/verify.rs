use std::io::Read;
use std::path::Path;

use log::info;
use sha2::{Digest, Sha256};

use crate::error::UpdateError;
use crate::release::AssetInfo;

/// Integrity check run on a downloaded artifact before it is installed.
pub trait ArtifactVerifier: Send + Sync {
    /// # Errors
    /// Returns an error when the artifact must not be installed.
    fn verify(&self, asset: &AssetInfo, path: &Path) -> Result<(), UpdateError>;
}

/// Accepts every artifact without inspecting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unverified;

impl ArtifactVerifier for Unverified {
    fn verify(&self, _asset: &AssetInfo, _path: &Path) -> Result<(), UpdateError> {
        Ok(())
    }
}

/// Checks the file against the `sha256:<hex>` digest the registry publishes
/// for the asset. Assets without a digest are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl ArtifactVerifier for Sha256Digest {
    fn verify(&self, asset: &AssetInfo, path: &Path) -> Result<(), UpdateError> {
        let expected = asset
            .digest
            .as_deref()
            .and_then(parse_sha256_digest)
            .ok_or_else(|| {
                UpdateError::verification(&asset.name, "no sha256 digest published for asset")
            })?;
        let actual = sha256_file(path)?;

        if actual.eq_ignore_ascii_case(&expected) {
            info!("Update checksum verified for {}", asset.name);
            Ok(())
        } else {
            Err(UpdateError::verification(
                &asset.name,
                format!("checksum mismatch: expected {expected}, got {actual}"),
            ))
        }
    }
}

fn parse_sha256_digest(digest: &str) -> Option<String> {
    let (algorithm, hash) = digest.split_once(':')?;
    if !algorithm.eq_ignore_ascii_case("sha256") {
        return None;
    }
    if hash.len() != 64 || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(hash.to_ascii_lowercase())
}

fn sha256_file(path: &Path) -> Result<String, UpdateError> {
    let mut file = std::fs::File::open(path).map_err(|error| {
        UpdateError::io_with_path("failed to open file for checksum", path, &error)
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            UpdateError::io_with_path("failed to read file for checksum", path, &error)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
