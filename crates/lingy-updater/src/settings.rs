use std::path::Path;
use std::time::Duration;

use lingy_platform::AppPaths;
use lingy_update::UpdaterConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterSettings {
    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default = "default_repo")]
    pub repo: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_helper_delay")]
    pub helper_delay_secs: u64,

    #[serde(default = "default_executable_name")]
    pub executable_name: String,

    #[serde(default)]
    pub verify_digest: bool,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_owner() -> String {
    "id-pm".to_string()
}

fn default_repo() -> String {
    "lingy".to_string()
}

fn default_api_base() -> String {
    lingy_update::DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    lingy_update::DEFAULT_USER_AGENT.to_string()
}

fn default_http_timeout() -> u64 {
    lingy_update::DEFAULT_TIMEOUT.as_secs()
}

fn default_helper_delay() -> u64 {
    lingy_update::DEFAULT_HELPER_DELAY.as_secs()
}

fn default_executable_name() -> String {
    if cfg!(windows) {
        "Lingy.exe".to_string()
    } else {
        "lingy".to_string()
    }
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            http_timeout_secs: default_http_timeout(),
            helper_delay_secs: default_helper_delay(),
            executable_name: default_executable_name(),
            verify_digest: false,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl UpdaterSettings {
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from(&paths.settings_file())
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(settings_path: &Path) -> Self {
        if !settings_path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(settings_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn updater_config(&self, paths: &AppPaths) -> UpdaterConfig {
        UpdaterConfig {
            api_base: self.api_base.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
            helper_delay: Duration::from_secs(self.helper_delay_secs),
            ..UpdaterConfig::for_paths(paths)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use lingy_platform::AppPaths;
    use serde_json::json;

    use super::UpdaterSettings;

    #[test]
    fn defaults_match_expected_values() {
        let settings = UpdaterSettings::default();

        assert_eq!(settings.owner, "id-pm");
        assert_eq!(settings.repo, "lingy");
        assert_eq!(settings.api_base, "https://api.github.com");
        assert_eq!(settings.user_agent, "LingyUpdater/1.0");
        assert_eq!(settings.http_timeout_secs, 10);
        assert_eq!(settings.helper_delay_secs, 1);
        assert!(!settings.verify_digest);
        assert!(!settings.debug_logging);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn partial_json_fills_remaining_fields_with_defaults() {
        let settings: UpdaterSettings = serde_json::from_value(json!({
            "owner": "someone",
            "verify_digest": true,
            "http_timeout_secs": 30
        }))
        .expect("settings JSON should deserialize");

        assert_eq!(settings.owner, "someone");
        assert_eq!(settings.repo, "lingy");
        assert!(settings.verify_digest);
        assert_eq!(settings.http_timeout_secs, 30);
        assert_eq!(settings.helper_delay_secs, 1);
    }

    #[test]
    fn load_from_falls_back_on_missing_or_corrupt_file() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");

        assert_eq!(UpdaterSettings::load_from(&path).repo, "lingy");

        std::fs::write(&path, "{ not json").expect("settings file should be written");
        assert_eq!(UpdaterSettings::load_from(&path).owner, "id-pm");

        std::fs::write(&path, r#"{"repo": "lingy-beta"}"#)
            .expect("settings file should be written");
        assert_eq!(UpdaterSettings::load_from(&path).repo, "lingy-beta");
    }

    #[test]
    fn updater_config_applies_timeouts_and_platform_dirs() {
        let paths = AppPaths {
            config_dir: PathBuf::from("/cfg"),
            cache_dir: PathBuf::from("/cache"),
            data_dir: PathBuf::from("/data"),
            temp_dir: PathBuf::from("/scratch"),
        };
        let settings = UpdaterSettings {
            http_timeout_secs: 3,
            helper_delay_secs: 2,
            api_base: "http://127.0.0.1:9000".to_string(),
            ..UpdaterSettings::default()
        };

        let config = settings.updater_config(&paths);

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.helper_delay, Duration::from_secs(2));
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.download_dir, PathBuf::from("/scratch"));
        assert_eq!(config.extraction_dir, paths.extraction_dir());
    }
}
