//! Monitor error types.

use std::time::Duration;

use capwatch_core::{Direction, SourceError};
use thiserror::Error;

/// A check failed before a decision could be made.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("{operation}: {source}")]
    Fetch {
        operation: &'static str,
        #[source]
        source: SourceError,
    },
}

impl MonitorError {
    /// Operation name the failure originated from.
    pub fn operation(&self) -> &'static str {
        match self {
            MonitorError::Fetch { operation, .. } => operation,
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// A check did not finish within its watchdog deadline.
///
/// Fatal: the runner stops every evaluator and returns this to the caller,
/// which is expected to exit the process so a supervisor restarts it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{check} deadlock detected on table {table}: no result after {deadline:?}")]
pub struct LivenessViolation {
    pub table: String,
    pub direction: Direction,
    pub check: &'static str,
    pub deadline: Duration,
}
