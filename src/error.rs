use thiserror::Error;

/// Per-request error taxonomy. None of these are fatal to the process;
/// callers decide whether to retry, and a mutation must never be retried
/// blindly without re-reading current status first.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    /// State machine precondition violated, including lost races. A normal,
    /// expected outcome ("already cancelled"), not a crash.
    #[error("illegal status transition: {0}")]
    InvalidTransition(String),

    #[error("no such record: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
