use sea_orm::error::DbErr;
use thiserror::Error;

/// Error taxonomy for the stock-allocation engine.
///
/// `StaleCandidate` and `NoCandidate` are the two ledger-level failures that
/// matter operationally: a conditional update that affected zero rows, and a
/// selection policy that found no row to mutate. Both are logged critical at
/// the call site and are never retried by the engine itself; retry, if any,
/// arrives as a fresh message.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("No ledger candidate: {0}")]
    NoCandidate(String),

    #[error("Stale ledger candidate: {0}")]
    StaleCandidate(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Helper for mapping `DbErr` in combinator chains.
    pub fn db_error(err: DbErr) -> Self {
        ServiceError::DatabaseError(err)
    }
}
