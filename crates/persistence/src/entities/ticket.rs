//! Ticket entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{EventSummary, Ticket, TicketDetails, TicketStatus, UserSummary};
use sqlx::FromRow;
use uuid::Uuid;

use super::event::EventStatusDb;

/// Database enum for ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
pub enum TicketStatusDb {
    Active,
    Used,
    Cancelled,
    Expired,
}

impl From<TicketStatusDb> for TicketStatus {
    fn from(status: TicketStatusDb) -> Self {
        match status {
            TicketStatusDb::Active => TicketStatus::Active,
            TicketStatusDb::Used => TicketStatus::Used,
            TicketStatusDb::Cancelled => TicketStatus::Cancelled,
            TicketStatusDb::Expired => TicketStatus::Expired,
        }
    }
}

impl From<TicketStatus> for TicketStatusDb {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Active => TicketStatusDb::Active,
            TicketStatus::Used => TicketStatusDb::Used,
            TicketStatus::Cancelled => TicketStatusDb::Cancelled,
            TicketStatus::Expired => TicketStatusDb::Expired,
        }
    }
}

/// Database row mapping for the tickets table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub status: TicketStatusDb,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TicketEntity> for Ticket {
    fn from(entity: TicketEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            event_id: entity.event_id,
            quantity: entity.quantity,
            total_price_cents: entity.total_price_cents,
            status: entity.status.into(),
            purchase_date: entity.purchase_date,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Ticket joined with its event and owner.
///
/// The joined columns are nullable so a dangling reference still yields the ticket.
#[derive(Debug, Clone, FromRow)]
pub struct TicketWithContextEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub total_price_cents: i64,
    pub status: TicketStatusDb,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub event_name: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_status: Option<EventStatusDb>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

impl From<TicketWithContextEntity> for TicketDetails {
    fn from(entity: TicketWithContextEntity) -> Self {
        let event = match (entity.event_name, entity.event_date, entity.event_status) {
            (Some(name), Some(event_date), Some(status)) => Some(EventSummary {
                id: entity.event_id,
                name,
                event_date,
                status: status.into(),
            }),
            _ => None,
        };
        let user = match (entity.user_name, entity.user_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: entity.user_id,
                name,
                email,
            }),
            _ => None,
        };

        Self {
            ticket: Ticket {
                id: entity.id,
                user_id: entity.user_id,
                event_id: entity.event_id,
                quantity: entity.quantity,
                total_price_cents: entity.total_price_cents,
                status: entity.status.into(),
                purchase_date: entity.purchase_date,
                created_at: entity.created_at,
                updated_at: entity.updated_at,
            },
            event,
            user,
        }
    }
}
