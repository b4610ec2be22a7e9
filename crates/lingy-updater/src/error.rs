use thiserror::Error;

use crate::update_lock::LockError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to resolve application paths: {0}")]
    Paths(#[from] lingy_platform::AppPathsError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("update failed: {0}")]
    Update(#[from] lingy_update::UpdateError),
}
