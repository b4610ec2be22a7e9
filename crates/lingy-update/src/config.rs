use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "LingyUpdater/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HELPER_DELAY: Duration = Duration::from_secs(1);
const EXTRACTION_DIR_NAME: &str = "Lingy_Update";

/// Runtime knobs for one [`Updater`](crate::Updater).
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Registry API root, e.g. `https://api.github.com`.
    pub api_base: String,
    pub user_agent: String,
    /// Per-request timeout for registry queries and downloads.
    pub timeout: Duration,
    /// Where downloaded artifacts are written.
    pub download_dir: PathBuf,
    /// Scratch directory for archive updates; removed before each extraction.
    pub extraction_dir: PathBuf,
    /// How long the swap helper waits for this process to exit.
    pub helper_delay: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        let temp = std::env::temp_dir();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            extraction_dir: temp.join(EXTRACTION_DIR_NAME),
            download_dir: temp,
            helper_delay: DEFAULT_HELPER_DELAY,
        }
    }
}

impl UpdaterConfig {
    /// Default configuration rooted at the platform temp directory.
    #[must_use]
    pub fn for_paths(paths: &lingy_platform::AppPaths) -> Self {
        Self {
            download_dir: paths.temp_dir.clone(),
            extraction_dir: paths.extraction_dir(),
            ..Self::default()
        }
    }
}
