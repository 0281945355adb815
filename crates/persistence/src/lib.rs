//! Persistence layer for the ticketing backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - The PostgreSQL booking store and read-side repositories
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use error::{map_sqlx_error, TicketQueryError};
pub use repositories::{PgBookingStore, TicketRepository};
