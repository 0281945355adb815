//! Ticket domain models and the ticket status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::EventSummary;
use super::user::UserSummary;

/// Status of a ticket.
///
/// Allowed transitions: `Active -> Used` and `Active -> Cancelled`.
/// `Used`, `Cancelled` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
    Expired,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Active => write!(f, "active"),
            TicketStatus::Used => write!(f, "used"),
            TicketStatus::Cancelled => write!(f, "cancelled"),
            TicketStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A status change outside the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: TicketStatus,
    pub to: TicketStatus,
}

impl TicketStatus {
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Active, TicketStatus::Used)
                | (TicketStatus::Active, TicketStatus::Cancelled)
        )
    }

    /// Returns `next` when the transition table allows it.
    pub fn transition_to(self, next: TicketStatus) -> Result<TicketStatus, IllegalTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Whether a ticket in this status still consumes event capacity.
    pub fn holds_capacity(self) -> bool {
        matches!(self, TicketStatus::Active | TicketStatus::Used)
    }
}

/// A purchased ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    /// Unit price at purchase time multiplied by quantity, in minor currency units.
    pub total_price_cents: i64,
    pub status: TicketStatus,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a ticket about to be inserted. New tickets always start `Active`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub purchase_date: DateTime<Utc>,
}

/// Ticket with the event and owner context attached for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TicketDetails {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl TicketDetails {
    /// Details without any context, used when the context lookup is unavailable.
    pub fn bare(ticket: Ticket) -> Self {
        Self {
            ticket,
            event: None,
            user: None,
        }
    }
}

/// One page of a user's tickets, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TicketPage {
    pub data: Vec<Ticket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
