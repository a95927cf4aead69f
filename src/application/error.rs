//! Engine-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Engine errors wrap domain errors and add session-level context.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("dragging is disabled by the builder configuration")]
    DragDisabled,

    #[error("config error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// The underlying domain error, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            EngineError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
