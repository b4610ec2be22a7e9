//! Artifact installation and process handoff.
//!
//! A running executable is usually locked by the OS, so the swap is never
//! done in-process. Instead a detached helper waits for this process to exit,
//! copies the new executable over the old one and starts it. The helper is
//! always spawned before this process terminates.
//!
//! State flow: `Idle -> Downloaded -> Extracting (archives only) -> Swapping
//! -> Relaunched -> Terminated`, or `Failed` from any step. A failed install
//! never terminates the process, so the old version keeps running.

#[cfg(windows)]
use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use lingy_platform::Detach;
use log::{debug, error, info};

use crate::asset::AssetKind;
use crate::error::UpdateError;
use crate::extract::{extract_zip, find_file, reset_dir};
use crate::progress::{ProgressSender, UpdateProgress};
use crate::release::AssetInfo;

#[cfg(not(windows))]
const HELPER_SCRIPT: &str = r#"sleep "$1" && cp -f "$2" "$3.lingy-new" && chmod 755 "$3.lingy-new" && mv -f "$3.lingy-new" "$3" && exec "$3""#;
#[cfg(not(windows))]
const HELPER_NAME: &str = "lingy-update-helper";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    Downloaded,
    Extracting,
    Swapping,
    Relaunched,
    Terminated,
    Failed,
}

/// A downloaded artifact ready to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub asset: AssetInfo,
    pub local_path: PathBuf,
    pub kind: AssetKind,
}

/// Parameters of the detached swap helper: wait `delay`, copy `source` over
/// `destination`, then start `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub delay: Duration,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl HelperCommand {
    #[cfg(windows)]
    pub const PROGRAM: &'static str = "cmd";
    #[cfg(not(windows))]
    pub const PROGRAM: &'static str = "sh";

    /// The shell line run by `cmd /S /C`. `ping` stands in for a sleep since
    /// `timeout` refuses to run without an interactive console.
    #[cfg(windows)]
    #[must_use]
    pub fn script(&self) -> String {
        format!(
            "ping -n {} 127.0.0.1 >NUL & copy /Y \"{}\" \"{}\" >NUL && start \"\" \"{}\"",
            self.delay.as_secs() + 1,
            self.source.display(),
            self.destination.display(),
            self.destination.display()
        )
    }

    /// Arguments after the program name. Paths travel as positional
    /// parameters and are never spliced into the script text.
    #[cfg(not(windows))]
    #[must_use]
    pub fn args(&self) -> Vec<std::ffi::OsString> {
        vec![
            "-c".into(),
            HELPER_SCRIPT.into(),
            HELPER_NAME.into(),
            self.delay.as_secs_f64().to_string().into(),
            self.source.clone().into_os_string(),
            self.destination.clone().into_os_string(),
        ]
    }

    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(Self::PROGRAM);
        #[cfg(windows)]
        command.raw_arg(format!("/S /C \"{}\"", self.script()));
        #[cfg(not(windows))]
        command.args(self.args());
        command
    }
}

/// A process the installer hands control to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRequest {
    /// Swap the executable via the helper, which then relaunches it.
    Helper(HelperCommand),
    /// Run a downloaded installer directly; it performs its own install.
    Direct(PathBuf),
}

/// Process boundary of the installer.
pub trait ProcessLauncher: Send + Sync {
    /// Start the requested process detached from this one without waiting
    /// for it.
    ///
    /// # Errors
    /// Returns an error when the process cannot be started.
    fn spawn(&self, request: &LaunchRequest) -> Result<(), UpdateError>;

    /// End the current process after a successful handoff.
    fn terminate(&self);
}

/// Spawns real detached processes and exits the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, request: &LaunchRequest) -> Result<(), UpdateError> {
        let (mut command, program) = match request {
            LaunchRequest::Helper(helper) => {
                (helper.to_command(), HelperCommand::PROGRAM.to_string())
            }
            LaunchRequest::Direct(path) => {
                (direct_command(path)?, path.display().to_string())
            }
        };

        command.detach();
        let child = command
            .spawn()
            .map_err(|error| UpdateError::spawn(program.clone(), error))?;
        debug!("Spawned {program} as pid {}", child.id());
        Ok(())
    }

    fn terminate(&self) {
        info!("Exiting so the update can complete");
        log::logger().flush();
        std::process::exit(0);
    }
}

/// Installers may need elevation, which only the shell's `start` can
/// trigger; `CreateProcess` would fail outright.
#[cfg(windows)]
fn direct_command(path: &Path) -> Result<Command, UpdateError> {
    let mut command = Command::new("cmd");
    command.raw_arg(format!("/C start \"\" \"{}\"", path.display()));
    Ok(command)
}

#[cfg(not(windows))]
fn direct_command(path: &Path) -> Result<Command, UpdateError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|error| {
        UpdateError::io_with_path("failed to mark installer executable", path, &error)
    })?;
    Ok(Command::new(path))
}

/// Drives one install attempt through [`InstallState`].
pub struct Installer {
    launcher: Arc<dyn ProcessLauncher>,
    extraction_dir: PathBuf,
    helper_delay: Duration,
    progress: ProgressSender,
    state: InstallState,
    history: Vec<InstallState>,
}

impl Installer {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        extraction_dir: impl Into<PathBuf>,
        helper_delay: Duration,
    ) -> Self {
        Self {
            launcher,
            extraction_dir: extraction_dir.into(),
            helper_delay,
            progress: ProgressSender::disabled(),
            state: InstallState::Idle,
            history: vec![InstallState::Idle],
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[InstallState] {
        &self.history
    }

    /// Install `plan` over `app_exe` and hand off to the new version.
    ///
    /// On success the launcher has been asked to terminate this process.
    ///
    /// # Errors
    /// Returns an error when extraction, locating the new executable or
    /// spawning the handoff process fails. The process keeps running.
    pub async fn apply(
        &mut self,
        plan: &UpdatePlan,
        app_exe: &Path,
    ) -> Result<InstallState, UpdateError> {
        self.transition(InstallState::Downloaded);

        let result = match plan.kind {
            AssetKind::Archive => self.apply_archive(plan, app_exe).await,
            AssetKind::Executable => self.apply_executable(plan),
        };

        match result {
            Ok(()) => {
                self.progress
                    .send(UpdateProgress::HandedOff(InstallState::Relaunched));
                self.launcher.terminate();
                self.transition(InstallState::Terminated);
                Ok(self.state)
            }
            Err(error) => {
                error!("Update install failed, keeping current version: {error}");
                self.transition(InstallState::Failed);
                Err(error)
            }
        }
    }

    async fn apply_archive(
        &mut self,
        plan: &UpdatePlan,
        app_exe: &Path,
    ) -> Result<(), UpdateError> {
        self.transition(InstallState::Extracting);
        self.progress.send(UpdateProgress::Extracting);

        let exe_name = app_exe.file_name().map(ToOwned::to_owned).ok_or_else(|| {
            UpdateError::io(
                "application path has no file name",
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    app_exe.display().to_string(),
                ),
            )
        })?;
        let archive = plan.local_path.clone();
        let dir = self.extraction_dir.clone();

        let new_exe = tokio::task::spawn_blocking(move || -> Result<PathBuf, UpdateError> {
            reset_dir(&dir)?;
            extract_zip(&archive, &dir)?;
            find_file(&dir, &exe_name)?.ok_or_else(|| UpdateError::MissingExecutable {
                name: exe_name.to_string_lossy().into_owned(),
                dir,
            })
        })
        .await
        .map_err(|error| UpdateError::io("extraction task failed", std::io::Error::other(error)))??;

        self.transition(InstallState::Swapping);
        self.progress.send(UpdateProgress::Applying);
        info!(
            "Applying update: {} -> {}",
            new_exe.display(),
            app_exe.display()
        );

        let helper = HelperCommand {
            delay: self.helper_delay,
            source: new_exe,
            destination: app_exe.to_path_buf(),
        };
        self.launcher.spawn(&LaunchRequest::Helper(helper))?;
        self.transition(InstallState::Relaunched);
        Ok(())
    }

    fn apply_executable(&mut self, plan: &UpdatePlan) -> Result<(), UpdateError> {
        self.transition(InstallState::Swapping);
        self.progress.send(UpdateProgress::Applying);
        info!("Launching installer {}", plan.local_path.display());

        self.launcher
            .spawn(&LaunchRequest::Direct(plan.local_path.clone()))?;
        self.transition(InstallState::Relaunched);
        Ok(())
    }

    fn transition(&mut self, next: InstallState) {
        debug!("Install state {:?} -> {next:?}", self.state);
        self.state = next;
        self.history.push(next);
    }
}
