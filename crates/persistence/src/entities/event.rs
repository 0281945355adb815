//! Event entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::EventStatus;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for event status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatusDb {
    Active,
    Ongoing,
    Completed,
    Cancelled,
}

impl From<EventStatusDb> for EventStatus {
    fn from(status: EventStatusDb) -> Self {
        match status {
            EventStatusDb::Active => EventStatus::Active,
            EventStatusDb::Ongoing => EventStatus::Ongoing,
            EventStatusDb::Completed => EventStatus::Completed,
            EventStatusDb::Cancelled => EventStatus::Cancelled,
        }
    }
}

impl From<EventStatus> for EventStatusDb {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Active => EventStatusDb::Active,
            EventStatus::Ongoing => EventStatusDb::Ongoing,
            EventStatus::Completed => EventStatusDb::Completed,
            EventStatus::Cancelled => EventStatusDb::Cancelled,
        }
    }
}

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub available: i32,
    pub price_cents: i64,
    pub status: EventStatusDb,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventEntity> for domain::models::Event {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            capacity: entity.capacity,
            available: entity.available,
            price_cents: entity.price_cents,
            status: entity.status.into(),
            event_date: entity.event_date,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_entity_to_domain() {
        let now = Utc::now();
        let entity = EventEntity {
            id: Uuid::new_v4(),
            name: "Open Air".to_string(),
            capacity: 100,
            available: 42,
            price_cents: 2500,
            status: EventStatusDb::Ongoing,
            event_date: now,
            created_at: now,
            updated_at: now,
        };

        let event: domain::models::Event = entity.clone().into();
        assert_eq!(event.id, entity.id);
        assert_eq!(event.available, 42);
        assert_eq!(event.capacity, 100);
        assert_eq!(event.status, EventStatus::Ongoing);
    }

    #[test]
    fn test_event_status_mapping_is_lossless() {
        for status in [
            EventStatus::Active,
            EventStatus::Ongoing,
            EventStatus::Completed,
            EventStatus::Cancelled,
        ] {
            let db: EventStatusDb = status.into();
            assert_eq!(EventStatus::from(db), status);
        }
    }
}
