//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::StoreError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Domain(DomainError::NotFound(_)) => exitcode::NOINPUT,
                ApplicationError::Domain(DomainError::InvalidOperation(_))
                | ApplicationError::Domain(DomainError::Validation { .. }) => exitcode::DATAERR,
                ApplicationError::Domain(DomainError::Consistency(_)) => exitcode::SOFTWARE,
                ApplicationError::Store(StoreError::Io { .. }) => exitcode::IOERR,
                ApplicationError::Store(StoreError::Transient(_)) => exitcode::TEMPFAIL,
                ApplicationError::Store(StoreError::Decode { .. }) => exitcode::DATAERR,
                ApplicationError::Store(_) => exitcode::SOFTWARE,
                ApplicationError::Config { .. } => exitcode::CONFIG,
            },
        }
    }
}
