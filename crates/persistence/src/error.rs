//! Persistence error types and database error classification.

use domain::StoreError;
use shared::pagination::CursorError;
use thiserror::Error;

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Classifies a `sqlx::Error` as a lock timeout, contention, or backend failure.
///
/// Waiting too long for a pooled connection counts as a lock timeout.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::LockTimeout,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(LOCK_NOT_AVAILABLE) => StoreError::LockTimeout,
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => StoreError::Contention,
            _ => StoreError::Backend(format!("Database error: {}", db_err)),
        },
        _ => StoreError::Backend(format!("Database error: {}", err)),
    }
}

/// Errors from read-side ticket queries.
#[derive(Debug, Error)]
pub enum TicketQueryError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
