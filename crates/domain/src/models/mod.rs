//! Domain models for the ticketing backend.

pub mod event;
pub mod report;
pub mod ticket;
pub mod user;

pub use event::{Event, EventStatus, EventSummary};
pub use report::{sales_rate, EventReport, SalesSummary};
pub use ticket::{IllegalTransition, NewTicket, Ticket, TicketDetails, TicketPage, TicketStatus};
pub use user::{User, UserSummary};
