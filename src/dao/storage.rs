use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Outcome of a diff-based update call.
///
/// `NotModified` covers both an empty patch and a patch whose every field
/// already matches the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// At least one field changed and was written.
    Updated,
    /// Nothing needed to be written.
    NotModified,
    /// The target row does not exist.
    NotFound,
}

impl UpdateOutcome {
    /// Whether the target row existed, regardless of whether it changed.
    pub fn found(self) -> bool {
        !matches!(self, UpdateOutcome::NotFound)
    }
}
