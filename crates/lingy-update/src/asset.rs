use crate::error::UpdateError;
use crate::release::AssetInfo;

const ARCHIVE_SUFFIX: &str = ".zip";
const EXECUTABLE_SUFFIX: &str = ".exe";

/// How a release artifact gets installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Zip archive holding the new application executable.
    Archive,
    /// Self-installing executable, launched as-is.
    Executable,
}

impl AssetKind {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if has_suffix(name, ARCHIVE_SUFFIX) {
            Some(Self::Archive)
        } else if has_suffix(name, EXECUTABLE_SUFFIX) {
            Some(Self::Executable)
        } else {
            None
        }
    }
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub asset: &'a AssetInfo,
    pub kind: AssetKind,
}

/// Pick the first asset with a recognized packaging suffix.
///
/// The registry's asset order is authoritative; nothing is re-sorted.
///
/// # Errors
/// Returns [`UpdateError::NoAssetFound`] when no asset is a `.zip` or `.exe`.
pub fn select(assets: &[AssetInfo]) -> Result<Selection<'_>, UpdateError> {
    assets
        .iter()
        .find_map(|asset| AssetKind::from_name(&asset.name).map(|kind| Selection { asset, kind }))
        .ok_or(UpdateError::NoAssetFound {
            count: assets.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::{AssetKind, select};
    use crate::error::UpdateErrorKind;
    use crate::release::AssetInfo;

    fn assets(names: &[&str]) -> Vec<AssetInfo> {
        names
            .iter()
            .map(|name| AssetInfo {
                name: (*name).to_string(),
                download_url: format!("https://example.com/{name}"),
                size: None,
                digest: None,
            })
            .collect()
    }

    #[test]
    fn first_recognized_asset_wins_in_list_order() {
        let list = assets(&["readme.txt", "app-1.2.zip", "app.exe"]);
        let selection = select(&list).expect("zip should be selected");
        assert_eq!(selection.asset.name, "app-1.2.zip");
        assert_eq!(selection.kind, AssetKind::Archive);

        let list = assets(&["checksums.txt", "Lingy-Setup.exe", "Lingy.zip"]);
        let selection = select(&list).expect("exe should be selected");
        assert_eq!(selection.asset.name, "Lingy-Setup.exe");
        assert_eq!(selection.kind, AssetKind::Executable);
    }

    #[test]
    fn no_recognized_suffix_is_no_asset_found() {
        let list = assets(&["readme.txt", "app.tar.gz", "zip", "app.exe.sig"]);
        let error = select(&list).expect_err("nothing should be selected");
        assert_eq!(error.kind(), UpdateErrorKind::NoAssetFound);

        let error = select(&[]).expect_err("empty list has no asset");
        assert_eq!(error.kind(), UpdateErrorKind::NoAssetFound);
    }

    #[test]
    fn suffix_match_ignores_ascii_case() {
        assert_eq!(AssetKind::from_name("LINGY.ZIP"), Some(AssetKind::Archive));
        assert_eq!(AssetKind::from_name("Setup.Exe"), Some(AssetKind::Executable));
        assert_eq!(AssetKind::from_name(".zi"), None);
        assert_eq!(AssetKind::from_name("Ω.zip"), Some(AssetKind::Archive));
    }
}
