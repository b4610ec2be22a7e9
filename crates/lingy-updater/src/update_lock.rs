use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another update check is already running")]
    AlreadyRunning,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Exclusive lock held for the duration of one update check. Two checks
/// would otherwise share the extraction directory.
///
/// Released when dropped.
pub struct UpdateLock {
    _file: File,
}

impl UpdateLock {
    pub fn acquire(lock_file_path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = lock_file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| LockError::io("failed to create lock directory", error))?;
        }

        let mut lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_file_path)
            .map_err(|error| LockError::io("failed to open update lock file", error))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {}
            Err(error) if error.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                return Err(LockError::AlreadyRunning);
            }
            Err(error) => {
                return Err(LockError::io("failed to acquire update lock", error));
            }
        }

        lock_file
            .set_len(0)
            .and_then(|()| lock_file.seek(SeekFrom::Start(0)).map(|_| ()))
            .and_then(|()| writeln!(lock_file, "{}", std::process::id()))
            .map_err(|error| LockError::io("failed to write update lock metadata", error))?;

        Ok(Self { _file: lock_file })
    }
}

#[cfg(test)]
mod tests {
    use super::{LockError, UpdateLock};

    #[test]
    fn second_acquire_reports_already_running() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let lock_path = temp_dir.path().join("data").join("update.lock");

        let first = UpdateLock::acquire(&lock_path).expect("first acquire should succeed");
        let second = UpdateLock::acquire(&lock_path);
        assert!(matches!(second, Err(LockError::AlreadyRunning)));

        drop(first);
        assert!(UpdateLock::acquire(&lock_path).is_ok());
    }

    #[test]
    fn lock_file_records_pid() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let lock_path = temp_dir.path().join("update.lock");

        let _lock = UpdateLock::acquire(&lock_path).expect("acquire should succeed");

        let contents = std::fs::read_to_string(&lock_path).expect("lock file should be readable");
        assert_eq!(contents.trim(), std::process::id().to_string());
    }
}
