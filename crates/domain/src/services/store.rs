//! Storage seam for the booking service.
//!
//! A [`BookingStore`] hands out [`BookingTransaction`]s. Every read and write a
//! booking operation performs goes through one transaction, and nothing it wrote
//! becomes visible to other transactions until [`BookingTransaction::commit`]
//! succeeds. Dropping a transaction without committing rolls it back.
//!
//! Row locks taken by the `*_for_update` reads are held until the transaction
//! ends. Lock waits are bounded; an expired wait returns
//! [`StoreError::LockTimeout`]. Callers lock a ticket row before its event row.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Event, NewTicket, Ticket, TicketDetails, User};

/// Factory for atomic booking units.
#[async_trait]
pub trait BookingStore: Send + Sync {
    type Tx: BookingTransaction;

    /// Open a new atomic unit.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Attach event and owner context to a committed ticket.
    async fn ticket_details(&self, ticket: Ticket) -> Result<TicketDetails, StoreError>;
}

/// One atomic unit of booking work.
#[async_trait]
pub trait BookingTransaction: Send {
    /// Plain read of the acting user; takes no lock.
    async fn get_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Read an event and hold an exclusive lock on its row.
    async fn get_event_for_update(&mut self, event_id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Add `delta` to the event's `available` count and return the new value.
    ///
    /// Fails without writing if the result would leave `0..=capacity`.
    async fn adjust_available(&mut self, event_id: Uuid, delta: i32) -> Result<i32, StoreError>;

    /// Insert a new `Active` ticket.
    async fn create_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    /// Read a ticket and hold an exclusive lock on its row.
    async fn get_ticket_for_update(
        &mut self,
        ticket_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Persist a ticket's status.
    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Make every write of this unit visible and release its locks.
    async fn commit(self) -> Result<(), StoreError>;
}
