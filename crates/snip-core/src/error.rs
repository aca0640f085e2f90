use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by persistence backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    CodeConflict(String),
    #[error("original url already shortened: {0}")]
    UrlConflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage backend is busy: {0}")]
    Busy(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::Timeout(_) | StorageError::Busy(_)
        )
    }
}

/// Errors surfaced by the [`Shortener`](crate::Shortener) contract.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage conflict, retry the operation: {0}")]
    Conflict(String),
    #[error("no free short code after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        if value.is_transient() {
            ShortenerError::Conflict(value.to_string())
        } else {
            ShortenerError::Storage(value)
        }
    }
}
