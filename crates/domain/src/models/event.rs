//! Event domain model (capacity-relevant subset).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Ongoing,
    Completed,
    Cancelled,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Active => write!(f, "active"),
            EventStatus::Ongoing => write!(f, "ongoing"),
            EventStatus::Completed => write!(f, "completed"),
            EventStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Snapshot of an event's sellable inventory.
///
/// `available` always stays within `0..=capacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub available: i32,
    /// Unit price in minor currency units.
    pub price_cents: i64,
    pub status: EventStatus,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Builds a fresh active event with its full capacity available.
    pub fn new(
        name: impl Into<String>,
        capacity: i32,
        price_cents: i64,
        event_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            capacity,
            available: capacity,
            price_cents,
            status: EventStatus::Active,
            event_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the event is taking purchases at all.
    pub fn is_available(&self) -> bool {
        self.status == EventStatus::Active && self.available > 0
    }

    pub fn has_capacity_for(&self, quantity: i32) -> bool {
        self.available >= quantity
    }
}

/// Event fields shown next to a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub status: EventStatus,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            event_date: event.event_date,
            status: event.status,
        }
    }
}
