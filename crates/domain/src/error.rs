//! Error taxonomy for booking operations.

use std::fmt;
use thiserror::Error;

use crate::models::TicketStatus;

/// Kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Event,
    Ticket,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Event => write!(f, "event"),
            Entity::Ticket => write!(f, "ticket"),
        }
    }
}

/// Why an ownership or account check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    InactiveUser,
    NotOwner,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::InactiveUser => "inactive_user",
            ForbiddenReason::NotOwner => "not_owner",
        }
    }
}

/// Why a capacity operation could not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// Event is not active or has nothing left.
    NotAvailable,
    /// Event has fewer units left than requested.
    InsufficientCapacity,
    /// Waiting for a row lock exceeded the configured bound.
    LockTimeout,
    /// The store aborted the unit because of a concurrent writer.
    Contention,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::NotAvailable => "not_available",
            ConflictReason::InsufficientCapacity => "insufficient_capacity",
            ConflictReason::LockTimeout => "lock_timeout",
            ConflictReason::Contention => "contention",
        }
    }
}

/// Business-rule or state-machine violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidStateReason {
    TooCloseToEvent,
    NotCancellable,
    IllegalTransition { from: TicketStatus, to: TicketStatus },
    InvalidQuantity,
}

impl InvalidStateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidStateReason::TooCloseToEvent => "too_close_to_event",
            InvalidStateReason::NotCancellable => "not_cancellable",
            InvalidStateReason::IllegalTransition { .. } => "illegal_transition",
            InvalidStateReason::InvalidQuantity => "invalid_quantity",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InvalidStateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidStateReason::IllegalTransition { from, to } => {
                write!(f, "{} ({} -> {})", self.as_str(), from, to)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Errors returned by the booking service.
///
/// Every failure leaves the store exactly as it was before the call.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(Entity),

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Invalid state: {0}")]
    InvalidState(InvalidStateReason),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable snake_case code for callers mapping errors to their own presentation.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound(_) => "not_found",
            BookingError::Forbidden(reason) => reason.as_str(),
            BookingError::Conflict(reason) => reason.as_str(),
            BookingError::InvalidState(reason) => reason.as_str(),
            BookingError::Internal(_) => "internal_error",
        }
    }

    /// True when retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::Conflict(ConflictReason::LockTimeout | ConflictReason::Contention)
        )
    }
}

/// Errors raised by a booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Lock wait timed out")]
    LockTimeout,

    #[error("Transaction aborted by a concurrent writer")]
    Contention,

    #[error("Storage failure: {0}")]
    Backend(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockTimeout => BookingError::Conflict(ConflictReason::LockTimeout),
            StoreError::Contention => BookingError::Conflict(ConflictReason::Contention),
            StoreError::Backend(msg) => BookingError::Internal(msg),
        }
    }
}
