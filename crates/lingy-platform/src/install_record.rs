use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::AppPaths;

#[cfg(windows)]
const REGISTRY_KEY: &str = "Software\\Lingy";
#[cfg(windows)]
const VERSION_VALUE: &str = "Version";
#[cfg(windows)]
const INSTALL_PATH_VALUE: &str = "InstallPath";

#[derive(Debug, Error)]
pub enum InstallRecordError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse install record: {0}")]
    Parse(#[source] serde_json::Error),
    #[cfg(windows)]
    #[error("registry read of {value} failed with code {code}")]
    Registry { value: &'static str, code: u32 },
}

/// Identity of the installed application, as written by its installer.
///
/// Read once at startup and handed to the updater. Nothing in this workspace
/// writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstallState {
    pub current_version: String,
    pub install_path: PathBuf,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    install_path: Option<String>,
}

impl LocalInstallState {
    /// Load the install record for this platform.
    ///
    /// Returns `None` when the application is not installed, meaning the
    /// record or either of its values is missing. An unreadable record is
    /// logged and also treated as not installed.
    #[must_use]
    pub fn load(paths: &AppPaths) -> Option<Self> {
        #[cfg(windows)]
        let result = {
            let _ = paths;
            Self::from_registry()
        };

        #[cfg(not(windows))]
        let result = Self::from_json_file(&paths.install_record_file());

        match result {
            Ok(state) => {
                if state.is_none() {
                    debug!("No install record found");
                }
                state
            }
            Err(error) => {
                warn!("Ignoring unreadable install record: {error}");
                None
            }
        }
    }

    /// Read the record from a JSON file with `version` and `install_path`
    /// string fields.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Option<Self>, InstallRecordError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(InstallRecordError::Io {
                    context: "failed to read install record",
                    source,
                });
            }
        };

        let raw: RawRecord = serde_json::from_str(&content).map_err(InstallRecordError::Parse)?;
        Ok(Self::from_values(raw.version, raw.install_path))
    }

    /// Read `Version` and `InstallPath` from `HKCU\Software\Lingy`.
    ///
    /// # Errors
    /// Returns an error when a registry read fails for any reason other than
    /// the key or value being absent.
    #[cfg(windows)]
    pub fn from_registry() -> Result<Option<Self>, InstallRecordError> {
        let version = registry::read_string(REGISTRY_KEY, VERSION_VALUE).map_err(|code| {
            InstallRecordError::Registry {
                value: VERSION_VALUE,
                code,
            }
        })?;
        let install_path =
            registry::read_string(REGISTRY_KEY, INSTALL_PATH_VALUE).map_err(|code| {
                InstallRecordError::Registry {
                    value: INSTALL_PATH_VALUE,
                    code,
                }
            })?;
        Ok(Self::from_values(version, install_path))
    }

    fn from_values(version: Option<String>, install_path: Option<String>) -> Option<Self> {
        let version = version.filter(|value| !value.trim().is_empty())?;
        let install_path = install_path.filter(|value| !value.trim().is_empty())?;
        Some(Self {
            current_version: version,
            install_path: PathBuf::from(install_path),
        })
    }
}

#[cfg(windows)]
mod registry {
    use windows_sys::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
    use windows_sys::Win32::System::Registry::{HKEY_CURRENT_USER, RRF_RT_REG_SZ, RegGetValueW};

    fn wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Read a `REG_SZ` value below `HKEY_CURRENT_USER`. A missing key or
    /// value reads as `None`; any other failure yields the Win32 error code.
    pub(super) fn read_string(subkey: &str, value: &str) -> Result<Option<String>, u32> {
        let subkey = wide(subkey);
        let value = wide(value);
        let mut size: u32 = 0;

        // SAFETY: both name buffers are NUL-terminated UTF-16 and outlive the
        // call; a null data pointer asks only for the required byte size.
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                subkey.as_ptr(),
                value.as_ptr(),
                RRF_RT_REG_SZ,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut size,
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status != ERROR_SUCCESS {
            return Err(status);
        }

        let mut buffer = vec![0_u16; (size as usize).div_ceil(2)];
        // SAFETY: `buffer` holds at least `size` bytes, and `size` is passed
        // back so the API never writes past it.
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                subkey.as_ptr(),
                value.as_ptr(),
                RRF_RT_REG_SZ,
                std::ptr::null_mut(),
                buffer.as_mut_ptr().cast(),
                &mut size,
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status != ERROR_SUCCESS {
            return Err(status);
        }

        let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        Ok(Some(String::from_utf16_lossy(&buffer[..len])))
    }
}
