use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::UpdateError;

/// Remove whatever a previous run left in `dir` and recreate it empty.
pub(crate) fn reset_dir(dir: &Path) -> Result<(), UpdateError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed stale extraction directory {}", dir.display()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            return Err(UpdateError::io_with_path(
                "failed to remove stale extraction directory",
                dir,
                &error,
            ));
        }
    }
    std::fs::create_dir_all(dir).map_err(|error| {
        UpdateError::io_with_path("failed to create extraction directory", dir, &error)
    })
}

/// What an extraction wrote and what it refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub skipped: usize,
}

/// Unpack `zip_path` below `dest`.
///
/// Entries that would land outside `dest` are counted as skipped, never
/// written.
///
/// # Errors
/// Returns an error when the archive cannot be read or an entry cannot be
/// written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<ExtractSummary, UpdateError> {
    let file = std::fs::File::open(zip_path).map_err(|error| {
        UpdateError::io_with_path("failed to open update archive", zip_path, &error)
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| UpdateError::zip("update is not a readable zip archive", error))?;

    let mut summary = ExtractSummary::default();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|error| UpdateError::zip("failed to read archive entry", error))?;

        match entry.enclosed_name() {
            None => {
                warn!("Refusing archive entry {:?} outside the update directory", entry.name());
                summary.skipped += 1;
            }
            Some(relative) if entry.is_dir() => create_dirs(&dest.join(relative))?,
            Some(relative) => {
                let mode = entry.unix_mode();
                unpack_file(&mut entry, mode, &dest.join(relative))?;
                summary.files += 1;
            }
        }
    }

    debug!(
        "Unpacked {} files ({} refused) into {}",
        summary.files,
        summary.skipped,
        dest.display()
    );
    Ok(summary)
}

fn create_dirs(dir: &Path) -> Result<(), UpdateError> {
    std::fs::create_dir_all(dir)
        .map_err(|error| UpdateError::io_with_path("failed to create directory", dir, &error))
}

fn unpack_file(
    entry: &mut impl std::io::Read,
    mode: Option<u32>,
    target: &Path,
) -> Result<(), UpdateError> {
    if let Some(parent) = target.parent() {
        create_dirs(parent)?;
    }
    let mut out = std::fs::File::create(target)
        .map_err(|error| UpdateError::io_with_path("failed to create file", target, &error))?;
    std::io::copy(entry, &mut out)
        .map_err(|error| UpdateError::io_with_path("failed to write file", target, &error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Some(mode) = mode {
            std::fs::set_permissions(target, std::fs::Permissions::from_mode(mode)).map_err(
                |error| UpdateError::io_with_path("failed to restore file mode", target, &error),
            )?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

/// Locate the file called `file_name` in an extracted update, preferring the
/// top level and falling back to a depth-first search.
pub(crate) fn find_file(dir: &Path, file_name: &OsStr) -> Result<Option<PathBuf>, UpdateError> {
    let direct = dir.join(file_name);
    if direct.is_file() {
        return Ok(Some(direct));
    }

    let entries = std::fs::read_dir(dir).map_err(|error| {
        UpdateError::io_with_path("failed to read extraction directory", dir, &error)
    })?;
    for entry in entries {
        let entry = entry
            .map_err(|error| UpdateError::io("failed to read extraction directory entry", error))?;
        let path = entry.path();
        if path.is_dir()
            && let Some(found) = find_file(&path, file_name)?
        {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::io::Write as _;
    use std::path::Path;

    use super::{ExtractSummary, extract_zip, find_file, reset_dir};
    use crate::error::UpdateErrorKind;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let zip_file = std::fs::File::create(path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, options)
                    .expect("directory entry should be written");
                continue;
            }
            writer
                .start_file(*name, options)
                .expect("file entry should be started");
            writer
                .write_all(content)
                .expect("file entry should be written");
        }
        writer.finish().expect("zip archive should be finalized");
    }

    #[test]
    fn release_layout_unpacks_next_to_its_dlls() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("Lingy-2.1.0.zip");
        let dest = temp.path().join("Lingy_Update");
        write_zip(
            &zip_path,
            &[
                ("Lingy/", b""),
                ("Lingy/Lingy.exe", b"MZ lingy 2.1"),
                ("Lingy/runtimes/lingy-core.dll", b"core"),
            ],
        );

        let summary = extract_zip(&zip_path, &dest).expect("release archive should unpack");

        assert_eq!(summary, ExtractSummary { files: 2, skipped: 0 });
        let exe = find_file(&dest, OsStr::new("Lingy.exe"))
            .expect("search should succeed")
            .expect("executable should be found below the bundle directory");
        assert_eq!(std::fs::read(exe).expect("exe readable"), b"MZ lingy 2.1");
        assert!(dest.join("Lingy/runtimes/lingy-core.dll").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn unpacked_executable_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("lingy-linux.zip");
        let dest = temp.path().join("Lingy_Update");
        write_zip(&zip_path, &[("lingy", b"#!/bin/sh\n")]);

        extract_zip(&zip_path, &dest).expect("archive should unpack");

        let mode = std::fs::metadata(dest.join("lingy"))
            .expect("binary should exist")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn traversal_entries_are_counted_and_not_written() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("hostile.zip");
        let dest = temp.path().join("Lingy_Update");
        write_zip(
            &zip_path,
            &[("../Lingy.exe", b"planted"), ("Lingy.exe", b"genuine")],
        );

        let summary = extract_zip(&zip_path, &dest).expect("archive should still unpack");

        assert_eq!(summary, ExtractSummary { files: 1, skipped: 1 });
        assert!(!temp.path().join("Lingy.exe").exists());
        assert_eq!(
            std::fs::read(dest.join("Lingy.exe")).expect("genuine exe written"),
            b"genuine"
        );
    }

    #[test]
    fn truncated_download_is_a_filesystem_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("Lingy.zip");
        std::fs::write(&zip_path, b"PK\x03\x04 cut short").expect("file should be written");

        let error = extract_zip(&zip_path, &temp.path().join("Lingy_Update"))
            .expect_err("broken archive should not unpack");
        assert_eq!(error.kind(), UpdateErrorKind::Filesystem);
    }

    #[test]
    fn reset_dir_drops_a_previous_attempt() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dir = temp.path().join("Lingy_Update");
        std::fs::create_dir_all(dir.join("Lingy")).expect("stale dir should be created");
        std::fs::write(dir.join("Lingy/Lingy.exe"), b"1.0").expect("stale exe should be written");

        reset_dir(&dir).expect("reset should succeed");

        assert!(dir.is_dir());
        assert!(
            find_file(&dir, OsStr::new("Lingy.exe"))
                .expect("search should succeed")
                .is_none(),
            "an old build must not satisfy the lookup"
        );

        let fresh = temp.path().join("fresh");
        reset_dir(&fresh).expect("reset of a missing dir should create it");
        assert!(fresh.is_dir());
    }

    #[test]
    fn find_file_prefers_top_level_then_searches_nested() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let root = temp.path();
        std::fs::create_dir_all(root.join("Lingy/bin")).expect("nested dir should be created");
        std::fs::write(root.join("Lingy/bin/Lingy.exe"), b"nested").expect("write nested");

        let nested = find_file(root, OsStr::new("Lingy.exe"))
            .expect("search should succeed")
            .expect("nested file should be found");
        assert_eq!(nested, root.join("Lingy/bin/Lingy.exe"));

        std::fs::write(root.join("Lingy.exe"), b"top").expect("write top-level");
        let top = find_file(root, OsStr::new("Lingy.exe"))
            .expect("search should succeed")
            .expect("top-level file should be found");
        assert_eq!(top, root.join("Lingy.exe"));

        assert!(
            find_file(root, OsStr::new("Other.exe"))
                .expect("search should succeed")
                .is_none()
        );
    }
}
