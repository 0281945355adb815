//! Domain services for the ticketing backend.
//!
//! Services contain business logic that operates on domain models.

pub mod booking;
pub mod clock;
pub mod memory;
pub mod store;

pub use booking::{BookingPolicy, BookingService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use memory::{FailurePoint, InMemoryBookingStore, InMemoryTransaction};
pub use store::{BookingStore, BookingTransaction};
