//! Error types for pair finder services.

use thiserror::Error;

use crate::validation::ValidationError;

/// Error surfaced to API callers.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream exchange or service error
    #[error("External service error: {0}")]
    External(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::External(_) => 502,
        }
    }

    /// Stable machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_REQUEST",
            Self::External(_) => "UPSTREAM_UNAVAILABLE",
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
