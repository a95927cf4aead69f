//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::EngineError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Infra(InfraError::Engine(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. }
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    exitcode::NOINPUT
                }
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Parse { .. } => exitcode::DATAERR,
                InfraError::Serialize(_) => exitcode::SOFTWARE,
                InfraError::Engine(EngineError::Domain(_)) => exitcode::DATAERR,
                InfraError::Engine(EngineError::DragDisabled)
                | InfraError::Engine(EngineError::Config { .. }) => exitcode::CONFIG,
            },
        }
    }
}
