//! Domain layer for the ticketing backend.
//!
//! This crate contains:
//! - Domain models (Event, Ticket, User, reports)
//! - The booking service and the store traits it runs against
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{BookingError, StoreError};
