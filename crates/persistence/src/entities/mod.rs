//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod event;
pub mod report;
pub mod ticket;
pub mod user;

pub use event::{EventEntity, EventStatusDb};
pub use report::{EventReportRow, SalesSummaryRow};
pub use ticket::{TicketEntity, TicketStatusDb, TicketWithContextEntity};
pub use user::UserEntity;
