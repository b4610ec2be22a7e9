use std::cmp::Ordering;

use thiserror::Error;

/// How a remote version relates to the locally installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    Older,
    Same,
    Newer,
}

impl VersionOrdering {
    /// Only a strictly newer remote version is worth installing. `Same` and
    /// `Older` both mean "no update".
    #[must_use]
    pub fn is_newer(self) -> bool {
        self == Self::Newer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version segment {segment:?} in {version:?}")]
pub struct VersionParseError {
    pub version: String,
    pub segment: String,
}

/// Compare the installed version with a remote one, segment by segment.
///
/// A single leading `v`/`V` is ignored, the shorter version is padded with
/// zero segments and segments are compared numerically, so `1.10` is newer
/// than `1.2` and `v2.0` equals `2.0.0`.
///
/// # Errors
/// Returns an error when any segment of either version is not a
/// non-negative integer.
pub fn compare(local: &str, remote: &str) -> Result<VersionOrdering, VersionParseError> {
    let local = parse_segments(local)?;
    let remote = parse_segments(remote)?;
    let len = local.len().max(remote.len());

    for i in 0..len {
        let ours = local.get(i).copied().unwrap_or(0);
        let theirs = remote.get(i).copied().unwrap_or(0);
        match theirs.cmp(&ours) {
            Ordering::Greater => return Ok(VersionOrdering::Newer),
            Ordering::Less => return Ok(VersionOrdering::Older),
            Ordering::Equal => {}
        }
    }

    Ok(VersionOrdering::Same)
}

fn parse_segments(version: &str) -> Result<Vec<u64>, VersionParseError> {
    let stripped = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    stripped
        .split('.')
        .map(|segment| {
            let valid = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
            valid
                .then(|| segment.parse::<u64>().ok())
                .flatten()
                .ok_or_else(|| VersionParseError {
                    version: version.to_string(),
                    segment: segment.to_string(),
                })
        })
        .collect()
}
