//! In-memory booking store.
//!
//! Rows are guarded by individual `tokio` mutexes, so operations on different
//! events never wait on each other. Writes are staged inside the transaction
//! and applied to the tables only on commit; dropping the transaction discards
//! them and releases its row locks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::store::{BookingStore, BookingTransaction};
use crate::error::StoreError;
use crate::models::{
    Event, EventSummary, NewTicket, Ticket, TicketDetails, TicketStatus, User, UserSummary,
};

/// Default bound on how long a transaction waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a simulated storage failure is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `create_ticket` and `save_ticket`.
    TicketWrite,
    /// `adjust_available`.
    CapacityWrite,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Event(Uuid),
    Ticket(Uuid),
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
}

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<tokio::sync::Mutex<()>>>>,
    failure: Mutex<Option<FailurePoint>>,
    lock_timeout: Duration,
}

impl Shared {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, key: RowKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Forget lock entries nobody holds or waits on.
    fn prune_row_locks(&self, keys: impl IntoIterator<Item = RowKey>) {
        let mut locks = self.row_locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if locks.get(&key).is_some_and(|m| Arc::strong_count(m) == 1) {
                locks.remove(&key);
            }
        }
    }

    fn check_failure(&self, point: FailurePoint) -> Result<(), StoreError> {
        let failure = *self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if failure == Some(point) {
            tracing::warn!(?point, "Simulating storage failure");
            return Err(StoreError::Backend(format!("simulated {:?} failure", point)));
        }
        Ok(())
    }
}

/// Booking store kept in process memory, for tests and local development.
#[derive(Debug, Clone)]
pub struct InMemoryBookingStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                failure: Mutex::new(None),
                lock_timeout,
            }),
        }
    }

    /// Make every later operation hitting `point` fail; `None` clears it.
    pub fn fail_on(&self, point: Option<FailurePoint>) {
        *self
            .shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = point;
    }

    pub fn insert_user(&self, user: User) {
        self.shared.tables().users.insert(user.id, user);
    }

    pub fn insert_event(&self, event: Event) {
        self.shared.tables().events.insert(event.id, event);
    }

    /// Committed state of an event.
    pub fn event(&self, event_id: Uuid) -> Option<Event> {
        self.shared.tables().events.get(&event_id).cloned()
    }

    /// Committed state of a ticket.
    pub fn ticket(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.shared.tables().tickets.get(&ticket_id).cloned()
    }

    pub fn tickets_for_event(&self, event_id: Uuid) -> Vec<Ticket> {
        self.shared
            .tables()
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Units held by active or used tickets of an event.
    pub fn held_quantity(&self, event_id: Uuid) -> i32 {
        self.tickets_for_event(event_id)
            .iter()
            .filter(|t| t.status.holds_capacity())
            .map(|t| t.quantity)
            .sum()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            rows: HeldRows {
                shared: Arc::clone(&self.shared),
                guards: Vec::new(),
            },
            staged_events: HashMap::new(),
            staged_tickets: HashMap::new(),
        })
    }

    async fn ticket_details(&self, ticket: Ticket) -> Result<TicketDetails, StoreError> {
        let (event, user) = {
            let tables = self.shared.tables();
            (
                tables.events.get(&ticket.event_id).map(EventSummary::from),
                tables.users.get(&ticket.user_id).map(UserSummary::from),
            )
        };
        Ok(TicketDetails {
            ticket,
            event,
            user,
        })
    }
}

/// Row locks held by one transaction. Releasing them prunes the lock table.
struct HeldRows {
    shared: Arc<Shared>,
    guards: Vec<(RowKey, OwnedMutexGuard<()>)>,
}

impl HeldRows {
    fn holds(&self, key: RowKey) -> bool {
        self.guards.iter().any(|(held, _)| *held == key)
    }
}

impl Drop for HeldRows {
    fn drop(&mut self) {
        let keys: Vec<RowKey> = self.guards.drain(..).map(|(key, _)| key).collect();
        self.shared.prune_row_locks(keys);
    }
}

/// Transaction over an [`InMemoryBookingStore`].
pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    rows: HeldRows,
    staged_events: HashMap<Uuid, Event>,
    staged_tickets: HashMap<Uuid, Ticket>,
}

impl InMemoryTransaction {
    async fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.rows.holds(key) {
            return Ok(());
        }

        let mutex = self.shared.row_lock(key);
        let acquired = tokio::time::timeout(self.shared.lock_timeout, mutex.lock_owned()).await;
        let Ok(guard) = acquired else {
            self.shared.prune_row_locks([key]);
            return Err(StoreError::LockTimeout);
        };

        self.rows.guards.push((key, guard));
        Ok(())
    }

    fn current_event(&self, event_id: Uuid) -> Option<Event> {
        self.staged_events
            .get(&event_id)
            .cloned()
            .or_else(|| self.shared.tables().events.get(&event_id).cloned())
    }

    fn current_ticket(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.staged_tickets
            .get(&ticket_id)
            .cloned()
            .or_else(|| self.shared.tables().tickets.get(&ticket_id).cloned())
    }
}

#[async_trait]
impl BookingTransaction for InMemoryTransaction {
    async fn get_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.shared.tables().users.get(&user_id).cloned())
    }

    async fn get_event_for_update(&mut self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        self.lock_row(RowKey::Event(event_id)).await?;
        Ok(self.current_event(event_id))
    }

    async fn adjust_available(&mut self, event_id: Uuid, delta: i32) -> Result<i32, StoreError> {
        self.lock_row(RowKey::Event(event_id)).await?;
        self.shared.check_failure(FailurePoint::CapacityWrite)?;

        let mut event = self
            .current_event(event_id)
            .ok_or_else(|| StoreError::Backend(format!("event {} not found", event_id)))?;

        let available = event.available + delta;
        if available < 0 || available > event.capacity {
            return Err(StoreError::Backend(format!(
                "available would leave 0..={} (got {})",
                event.capacity, available
            )));
        }

        event.available = available;
        event.updated_at = Utc::now();
        self.staged_events.insert(event_id, event);
        Ok(available)
    }

    async fn create_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        self.shared.check_failure(FailurePoint::TicketWrite)?;

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            user_id: ticket.user_id,
            event_id: ticket.event_id,
            quantity: ticket.quantity,
            total_price_cents: ticket.total_price_cents,
            status: TicketStatus::Active,
            purchase_date: ticket.purchase_date,
            created_at: now,
            updated_at: now,
        };

        self.staged_tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket_for_update(
        &mut self,
        ticket_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError> {
        self.lock_row(RowKey::Ticket(ticket_id)).await?;
        Ok(self.current_ticket(ticket_id))
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        self.lock_row(RowKey::Ticket(ticket.id)).await?;
        self.shared.check_failure(FailurePoint::TicketWrite)?;

        let mut stored = self
            .current_ticket(ticket.id)
            .ok_or_else(|| StoreError::Backend(format!("ticket {} not found", ticket.id)))?;
        stored.status = ticket.status;
        stored.updated_at = Utc::now();
        self.staged_tickets.insert(ticket.id, stored);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.shared.check_failure(FailurePoint::Commit)?;

        {
            let mut tables = self.shared.tables();
            tables.events.extend(self.staged_events);
            tables.tickets.extend(self.staged_tickets);
        }

        // Row locks are released only after the writes are visible.
        drop(self.rows);
        Ok(())
    }
}
