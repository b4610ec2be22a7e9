//! Update check for an installed Lingy.
//!
//! Reads the install record, asks the release registry for a newer version
//! and hands off to it. Exits 0 when there is nothing to do.

mod error;
mod logging;
mod settings;
mod update_lock;

use std::process::ExitCode;
use std::sync::Arc;

use lingy_platform::{AppPaths, LocalInstallState};
use lingy_update::{Sha256Digest, SystemLauncher, Updater};
use log::{error, info};

use crate::error::AppError;
use crate::settings::UpdaterSettings;
use crate::update_lock::{LockError, UpdateLock};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = UpdaterSettings::load();

    let paths = match AppPaths::new().map_err(AppError::from) {
        Ok(paths) => paths,
        Err(error) => {
            // The log lives under these paths, so stderr is all there is.
            eprintln!("lingy-updater: {error}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&paths, settings.debug_logging, settings.max_log_size_bytes);

    let code = match run(&paths, &settings).await {
        Ok(applied) => {
            if !applied {
                info!("Lingy is up to date");
            }
            ExitCode::SUCCESS
        }
        Err(AppError::Lock(LockError::AlreadyRunning)) => {
            info!("Another update check is in progress");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    };
    log::logger().flush();
    code
}

async fn run(paths: &AppPaths, settings: &UpdaterSettings) -> Result<bool, AppError> {
    let _lock = UpdateLock::acquire(&paths.update_lock_file())?;

    let install = LocalInstallState::load(paths);
    if let Some(install) = &install {
        info!(
            "Installed version {} at {}",
            install.current_version,
            install.install_path.display()
        );
    }

    let config = settings.updater_config(paths);
    let mut updater = Updater::new(&config, Arc::new(SystemLauncher))?;
    if settings.verify_digest {
        updater = updater.with_verifier(Arc::new(Sha256Digest));
    }

    let applied = updater
        .check_installed(
            &settings.owner,
            &settings.repo,
            install.as_ref(),
            &settings.executable_name,
        )
        .await?;
    Ok(applied)
}
