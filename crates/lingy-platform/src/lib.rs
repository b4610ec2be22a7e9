//! Platform glue for the Lingy updater.
//!
//! - Per-OS application directories.
//! - The read-only install record written by the Lingy installer.
//! - A `Command` adapter for detached, windowless child processes.

mod commands;
mod install_record;
mod paths;

pub use commands::Detach;
pub use install_record::{InstallRecordError, LocalInstallState};
pub use paths::{AppPaths, AppPathsError};
