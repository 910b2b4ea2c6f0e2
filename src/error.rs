//! Service-level error taxonomy shared by every operation the core exposes.

use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// No storage backend is installed; the core is running in degraded mode.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Caller is not the administrator of the game, or the admin session has ended.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the caller; correct and resubmit.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current game or submission state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested game, player, task, or submission was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The game already holds its maximum number of players.
    #[error("game is full: {0}")]
    GameFull(String),
    /// Lost a concurrency race (join slot taken, code collision); safe to retry.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Gateway call exceeded its bounded timeout.
    #[error("operation timed out")]
    Timeout,
}

impl ServiceError {
    /// Whether retrying the same operation can reasonably succeed.
    ///
    /// Conflicts clear once state is re-read or a new code is drawn; transient
    /// storage failures clear with backoff. Everything else needs caller input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Unavailable(_)
                | ServiceError::Degraded
                | ServiceError::Conflict(_)
                | ServiceError::Timeout
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}
