//! Error types for mlgate-core

use thiserror::Error;

/// Failures raised by a model handler.
///
/// The variant decides how the gateway reports the failure: see the
/// translation table in `mlgate-api`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    /// A resource the handler needs is missing (e.g. a trained artifact)
    #[error("{0}")]
    NotFound(String),

    /// An internal assertion of the handler did not hold
    #[error("{0}")]
    Invariant(String),

    /// Out-of-range access inside the handler
    #[error("{0}")]
    Index(String),

    /// Any other handler failure
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

pub type HandlerResult<T> = std::result::Result<T, HandlerError>;
