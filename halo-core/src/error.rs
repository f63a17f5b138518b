use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please fill in all fields ({0} is empty)")]
    EmptyField(&'static str),

    #[error("passwords do not match")]
    PasswordMismatch,
}

#[derive(Error, Debug)]
pub enum HaloError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage operation failed: {0}")]
    StorageOperationFailed(String),

    #[error("not signed in; run `signin` or `signup` first")]
    NotSignedIn,

    #[error("no such file: {0}")]
    NotFound(String),
}

impl HaloError {
    /// Storage failures leave prior state intact, so the action can be repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HaloError::StorageUnavailable(_) | HaloError::StorageOperationFailed(_)
        )
    }

    pub(crate) fn unavailable(e: impl std::fmt::Display) -> Self {
        HaloError::StorageUnavailable(e.to_string())
    }

    pub(crate) fn op_failed(e: impl std::fmt::Display) -> Self {
        HaloError::StorageOperationFailed(e.to_string())
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, HaloError>;
