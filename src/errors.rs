use thiserror::Error;

pub type Result<T> = std::result::Result<T, FinanceError>;

/// Unified error type for the ledger core, its services, and storage backends.
#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    #[error("concurrent update on {collection}/{key}")]
    Conflict { collection: &'static str, key: String },
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl FinanceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        FinanceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        FinanceError::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn conflict(collection: &'static str, key: impl Into<String>) -> Self {
        FinanceError::Conflict {
            collection,
            key: key.into(),
        }
    }

    /// Conflicts are transient: the caller may re-read and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FinanceError::Conflict { .. })
    }
}

impl From<std::io::Error> for FinanceError {
    fn from(err: std::io::Error) -> Self {
        FinanceError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for FinanceError {
    fn from(err: serde_json::Error) -> Self {
        FinanceError::Storage(err.to_string())
    }
}
