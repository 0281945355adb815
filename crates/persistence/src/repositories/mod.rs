//! Repository implementations for database operations.

pub mod booking_store;
pub mod ticket;

pub use booking_store::{PgBookingStore, PgBookingTransaction};
pub use ticket::TicketRepository;
