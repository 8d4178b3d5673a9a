//! Errors returned by remote collaborators.

use thiserror::Error;

/// Result type alias for collaborator calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors from a metrics or table-metadata lookup.
///
/// Every variant is recoverable from the monitor's point of view: the
/// current tick is skipped and the next one retries.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{operation}: {message}")]
    Remote {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("invalid evaluation window: {0}")]
    InvalidWindow(String),
}

impl SourceError {
    /// Build a `Remote` error from any displayable transport error.
    pub fn remote(operation: &'static str, err: impl std::fmt::Display) -> Self {
        SourceError::Remote {
            operation,
            message: err.to_string(),
        }
    }
}
