use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgendaError {
    /// Input rejected before any store call.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(InfraError),
    /// A batch stopped at its first failed write. Earlier writes stay applied.
    #[error("stopped after {applied} of {planned} store writes: {source}")]
    PartiallyApplied {
        applied: usize,
        planned: usize,
        #[source]
        source: InfraError,
    },
}

impl From<InfraError> for AgendaError {
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::NotFound(what) => Self::NotFound(what),
            InfraError::InvalidRecord(message) => Self::Validation(message),
            other => Self::Store(other),
        }
    }
}
