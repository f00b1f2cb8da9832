use thiserror::Error;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range caller data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A referenced entity is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// The caller lacks the required relationship to the entity.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The operation is not applicable in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A persistence call failed.
    #[error("storage unavailable")]
    Unavailable(#[from] StorageError),
    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable tag used in protocol responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::Unavailable(_) => "database_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
