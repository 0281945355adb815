//! Booking service: ticket purchase, cancellation and status changes.
//!
//! Each operation runs inside one store transaction. Preconditions are checked
//! against the row-locked snapshot read in that transaction, and every write of
//! the operation commits together or not at all.

use chrono::Duration;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::validation::{booking_window_open, quantity_in_range, total_price_cents};

use super::clock::{Clock, SystemClock};
use super::store::{BookingStore, BookingTransaction};
use crate::error::{BookingError, ConflictReason, Entity, ForbiddenReason, InvalidStateReason};
use crate::models::{NewTicket, Ticket, TicketDetails, TicketStatus};

/// Business rules applied to every booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// Purchases close this long before the event starts.
    pub purchase_cutoff: Duration,
    /// Cancellations close this long before the event starts.
    pub cancellation_cutoff: Duration,
    /// Largest quantity a single purchase may request, if limited.
    pub max_quantity_per_purchase: Option<i32>,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            purchase_cutoff: Duration::hours(1),
            cancellation_cutoff: Duration::hours(2),
            max_quantity_per_purchase: None,
        }
    }
}

impl BookingPolicy {
    fn check_quantity(&self, quantity: i32) -> Result<(), BookingError> {
        let max = self.max_quantity_per_purchase.unwrap_or(i32::MAX);
        if !quantity_in_range(quantity, max) {
            debug!(quantity, max, "Quantity out of range");
            return Err(BookingError::InvalidState(InvalidStateReason::InvalidQuantity));
        }
        Ok(())
    }
}

/// Orchestrates purchases and cancellations against a [`BookingStore`].
pub struct BookingService<S> {
    store: S,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: S, policy: BookingPolicy) -> Self {
        Self {
            store,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for the booking windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Buy `quantity` units of `event_id` for `user_id`.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %user_id, event_id = %event_id, quantity = quantity)
    )]
    pub async fn purchase_ticket(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
    ) -> Result<TicketDetails, BookingError> {
        let result = self.purchase_in_tx(user_id, event_id, quantity).await;
        record_outcome("booking_purchases_total", &result);

        let ticket = result?;
        counter!("booking_tickets_sold_total").increment(ticket.quantity as u64);
        info!(
            ticket_id = %ticket.id,
            quantity = ticket.quantity,
            total_price_cents = ticket.total_price_cents,
            "Ticket purchased"
        );

        Ok(self.attach_context(ticket).await)
    }

    async fn purchase_in_tx(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
    ) -> Result<Ticket, BookingError> {
        self.policy.check_quantity(quantity)?;

        let mut tx = self.store.begin().await?;

        let user = tx
            .get_user(user_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::User))?;
        if !user.is_active {
            return Err(BookingError::Forbidden(ForbiddenReason::InactiveUser));
        }

        let event = tx
            .get_event_for_update(event_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Event))?;
        if !event.is_available() {
            return Err(BookingError::Conflict(ConflictReason::NotAvailable));
        }
        if !event.has_capacity_for(quantity) {
            debug!(available = event.available, quantity, "Not enough capacity");
            return Err(BookingError::Conflict(ConflictReason::InsufficientCapacity));
        }

        let now = self.clock.now();
        if !booking_window_open(event.event_date, now, self.policy.purchase_cutoff) {
            return Err(BookingError::InvalidState(InvalidStateReason::TooCloseToEvent));
        }

        let total = total_price_cents(event.price_cents, quantity)
            .ok_or_else(|| BookingError::Internal("total price overflow".to_string()))?;

        let ticket = tx
            .create_ticket(NewTicket {
                user_id,
                event_id,
                quantity,
                total_price_cents: total,
                purchase_date: now,
            })
            .await?;
        tx.adjust_available(event_id, -quantity).await?;
        tx.commit().await?;

        Ok(ticket)
    }

    /// Cancel `ticket_id` on behalf of its owner and return its units to the event.
    #[tracing::instrument(skip_all, fields(ticket_id = %ticket_id, user_id = %user_id))]
    pub async fn cancel_ticket(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
    ) -> Result<Ticket, BookingError> {
        let result = self.cancel_in_tx(ticket_id, Some(user_id)).await;
        record_outcome("booking_cancellations_total", &result);

        let ticket = result?;
        info!(quantity = ticket.quantity, "Ticket cancelled");
        Ok(ticket)
    }

    /// Move a ticket to `new_status`.
    ///
    /// `Cancelled` follows the cancellation rules (window check, capacity
    /// returned) with the ticket owner as the acting user. `Used` never touches
    /// event capacity. Every other target is rejected.
    #[tracing::instrument(skip_all, fields(ticket_id = %ticket_id, new_status = %new_status))]
    pub async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        new_status: TicketStatus,
    ) -> Result<Ticket, BookingError> {
        if new_status == TicketStatus::Cancelled {
            let result = self.cancel_in_tx(ticket_id, None).await;
            record_outcome("booking_cancellations_total", &result);
            return result;
        }

        let mut tx = self.store.begin().await?;
        let mut ticket = tx
            .get_ticket_for_update(ticket_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Ticket))?;

        ticket.status = ticket.status.transition_to(new_status).map_err(|e| {
            BookingError::InvalidState(InvalidStateReason::IllegalTransition {
                from: e.from,
                to: e.to,
            })
        })?;

        tx.save_ticket(&ticket).await?;
        tx.commit().await?;

        info!(status = %ticket.status, "Ticket status updated");
        Ok(ticket)
    }

    /// Shared cancellation path. `acting_user` is checked against the owner when set.
    async fn cancel_in_tx(
        &self,
        ticket_id: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<Ticket, BookingError> {
        let mut tx = self.store.begin().await?;

        let mut ticket = tx
            .get_ticket_for_update(ticket_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Ticket))?;

        if let Some(user_id) = acting_user {
            if ticket.user_id != user_id {
                return Err(BookingError::Forbidden(ForbiddenReason::NotOwner));
            }
        }

        ticket.status = match ticket.status.transition_to(TicketStatus::Cancelled) {
            Ok(status) => status,
            Err(e) if acting_user.is_some() => {
                debug!(status = %e.from, "Ticket is not cancellable");
                return Err(BookingError::InvalidState(InvalidStateReason::NotCancellable));
            }
            Err(e) => {
                return Err(BookingError::InvalidState(
                    InvalidStateReason::IllegalTransition {
                        from: e.from,
                        to: e.to,
                    },
                ))
            }
        };

        let event = tx
            .get_event_for_update(ticket.event_id)
            .await?
            .ok_or(BookingError::NotFound(Entity::Event))?;

        if !booking_window_open(
            event.event_date,
            self.clock.now(),
            self.policy.cancellation_cutoff,
        ) {
            return Err(BookingError::InvalidState(InvalidStateReason::TooCloseToEvent));
        }

        tx.save_ticket(&ticket).await?;
        tx.adjust_available(event.id, ticket.quantity).await?;
        tx.commit().await?;

        Ok(ticket)
    }

    async fn attach_context(&self, ticket: Ticket) -> TicketDetails {
        let ticket_id = ticket.id;
        match self.store.ticket_details(ticket.clone()).await {
            Ok(details) => details,
            Err(e) => {
                warn!(ticket_id = %ticket_id, error = %e, "Failed to load ticket context");
                TicketDetails::bare(ticket)
            }
        }
    }
}

fn record_outcome<T>(metric: &'static str, result: &Result<T, BookingError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => {
            if let BookingError::Internal(msg) = e {
                tracing::error!(error = %msg, "Booking transaction failed");
            }
            e.code()
        }
    };
    counter!(metric, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, User};
    use crate::services::clock::FixedClock;
    use crate::services::memory::{FailurePoint, InMemoryBookingStore};
    use chrono::{DateTime, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    struct Fixture {
        service: BookingService<InMemoryBookingStore>,
        store: InMemoryBookingStore,
        clock: Arc<FixedClock>,
        user: User,
        event: Event,
    }

    fn fixture(capacity: i32, price_cents: i64, starts_in: Duration) -> Fixture {
        let store = InMemoryBookingStore::new();
        let clock = Arc::new(FixedClock::new(start()));
        let user = User::new("Ada", "ada@example.com");
        let event = Event::new("Concert", capacity, price_cents, start() + starts_in);
        store.insert_user(user.clone());
        store.insert_event(event.clone());

        let service = BookingService::new(store.clone(), BookingPolicy::default())
            .with_clock(clock.clone());

        Fixture {
            service,
            store,
            clock,
            user,
            event,
        }
    }

    fn available(f: &Fixture) -> i32 {
        f.store.event(f.event.id).unwrap().available
    }

    #[tokio::test]
    async fn test_purchase_creates_ticket_and_decrements() {
        let f = fixture(10, 5000, Duration::hours(5));

        let details = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap();

        assert_eq!(details.ticket.quantity, 3);
        assert_eq!(details.ticket.total_price_cents, 15000);
        assert_eq!(details.ticket.status, TicketStatus::Active);
        assert_eq!(details.ticket.purchase_date, start());
        assert_eq!(details.event.as_ref().unwrap().name, "Concert");
        assert_eq!(details.user.as_ref().unwrap().email, "ada@example.com");
        assert_eq!(available(&f), 7);
    }

    #[tokio::test]
    async fn test_purchase_unknown_user() {
        let f = fixture(10, 5000, Duration::hours(5));
        let err = f
            .service
            .purchase_ticket(Uuid::new_v4(), f.event.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Entity::User)));
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_purchase_inactive_user() {
        let f = fixture(10, 5000, Duration::hours(5));
        let mut inactive = User::new("Bob", "bob@example.com");
        inactive.is_active = false;
        f.store.insert_user(inactive.clone());

        let err = f
            .service
            .purchase_ticket(inactive.id, f.event.id, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "inactive_user");
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_purchase_unknown_event() {
        let f = fixture(10, 5000, Duration::hours(5));
        let err = f
            .service
            .purchase_ticket(f.user.id, Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Entity::Event)));
    }

    #[tokio::test]
    async fn test_purchase_inactive_event() {
        let f = fixture(10, 5000, Duration::hours(5));
        let mut cancelled = Event::new("Postponed", 10, 5000, start() + Duration::days(1));
        cancelled.status = crate::models::EventStatus::Cancelled;
        f.store.insert_event(cancelled.clone());

        let err = f
            .service
            .purchase_ticket(f.user.id, cancelled.id, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_available");
    }

    #[tokio::test]
    async fn test_purchase_too_close_to_event() {
        let f = fixture(10, 5000, Duration::minutes(59));
        let err = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "too_close_to_event");
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_purchase_exactly_at_cutoff_succeeds() {
        let f = fixture(10, 5000, Duration::hours(1));
        assert!(f
            .service
            .purchase_ticket(f.user.id, f.event.id, 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_purchase_rejects_non_positive_quantity() {
        let f = fixture(10, 5000, Duration::hours(5));
        for quantity in [0, -1] {
            let err = f
                .service
                .purchase_ticket(f.user.id, f.event.id, quantity)
                .await
                .unwrap_err();
            assert_eq!(err.code(), "invalid_quantity");
        }
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_purchase_respects_max_quantity_policy() {
        let f = fixture(10, 5000, Duration::hours(5));
        let policy = BookingPolicy {
            max_quantity_per_purchase: Some(4),
            ..BookingPolicy::default()
        };
        let service = BookingService::new(f.store.clone(), policy).with_clock(f.clock.clone());

        let err = service
            .purchase_ticket(f.user.id, f.event.id, 5)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_quantity");
        assert!(service.purchase_ticket(f.user.id, f.event.id, 4).await.is_ok());
    }

    #[tokio::test]
    async fn test_purchase_boundary() {
        let f = fixture(10, 5000, Duration::hours(5));

        let err = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 11)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Conflict(ConflictReason::InsufficientCapacity)
        ));
        assert_eq!(available(&f), 10);

        f.service
            .purchase_ticket(f.user.id, f.event.id, 10)
            .await
            .unwrap();
        assert_eq!(available(&f), 0);

        let err = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_available");
    }

    #[tokio::test]
    async fn test_purchase_rolls_back_when_capacity_write_fails() {
        let f = fixture(10, 5000, Duration::hours(5));
        f.store.fail_on(Some(FailurePoint::CapacityWrite));

        let err = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Internal(_)));
        assert_eq!(available(&f), 10);
        assert!(f.store.tickets_for_event(f.event.id).is_empty());
    }

    #[tokio::test]
    async fn test_purchase_rolls_back_when_commit_fails() {
        let f = fixture(10, 5000, Duration::hours(5));
        f.store.fail_on(Some(FailurePoint::Commit));

        assert!(f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .is_err());
        assert_eq!(available(&f), 10);
        assert!(f.store.tickets_for_event(f.event.id).is_empty());

        f.store.fail_on(None);
        assert!(f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .is_ok());
        assert_eq!(available(&f), 8);
    }

    #[tokio::test]
    async fn test_purchase_rolls_back_when_ticket_write_fails() {
        let f = fixture(10, 5000, Duration::hours(5));
        f.store.fail_on(Some(FailurePoint::TicketWrite));

        let err = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Internal(_)));
        assert_eq!(available(&f), 10);
        assert!(f.store.tickets_for_event(f.event.id).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_returns_capacity() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;

        let cancelled = f.service.cancel_ticket(ticket.id, f.user.id).await.unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_forbidden() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;

        let err = f
            .service
            .cancel_ticket(ticket.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_owner");
        assert_eq!(available(&f), 7);
    }

    #[tokio::test]
    async fn test_cancel_unknown_ticket() {
        let f = fixture(10, 5000, Duration::hours(3));
        let err = f
            .service
            .cancel_ticket(Uuid::new_v4(), f.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Entity::Ticket)));
    }

    #[tokio::test]
    async fn test_cancel_twice_is_rejected() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;
        f.service.cancel_ticket(ticket.id, f.user.id).await.unwrap();

        let err = f
            .service
            .cancel_ticket(ticket.id, f.user.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidState(InvalidStateReason::NotCancellable)
        ));
        assert_eq!(available(&f), 10);
        assert_eq!(
            f.store.ticket(ticket.id).unwrap().status,
            TicketStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_rolls_back_when_capacity_write_fails() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;

        f.store.fail_on(Some(FailurePoint::CapacityWrite));
        let err = f
            .service
            .cancel_ticket(ticket.id, f.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Internal(_)));
        assert_eq!(f.store.ticket(ticket.id).unwrap().status, TicketStatus::Active);
        assert_eq!(available(&f), 7);
    }

    #[tokio::test]
    async fn test_cancel_rolls_back_when_ticket_write_fails() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;

        f.store.fail_on(Some(FailurePoint::TicketWrite));
        let err = f
            .service
            .cancel_ticket(ticket.id, f.user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Internal(_)));
        assert_eq!(f.store.ticket(ticket.id).unwrap().status, TicketStatus::Active);
        assert_eq!(available(&f), 7);
    }

    #[tokio::test]
    async fn test_cancel_rolls_back_when_commit_fails() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 3)
            .await
            .unwrap()
            .ticket;

        f.store.fail_on(Some(FailurePoint::Commit));
        assert!(f.service.cancel_ticket(ticket.id, f.user.id).await.is_err());
        assert_eq!(f.store.ticket(ticket.id).unwrap().status, TicketStatus::Active);
        assert_eq!(available(&f), 7);

        f.store.fail_on(None);
        f.service.cancel_ticket(ticket.id, f.user.id).await.unwrap();
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_mark_used_rolls_back_when_commit_fails() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .unwrap()
            .ticket;

        f.store.fail_on(Some(FailurePoint::Commit));
        assert!(f
            .service
            .update_ticket_status(ticket.id, TicketStatus::Used)
            .await
            .is_err());
        assert_eq!(f.store.ticket(ticket.id).unwrap().status, TicketStatus::Active);
        assert_eq!(available(&f), 8);
    }

    #[tokio::test]
    async fn test_mark_used_keeps_capacity() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 2)
            .await
            .unwrap()
            .ticket;

        let used = f
            .service
            .update_ticket_status(ticket.id, TicketStatus::Used)
            .await
            .unwrap();
        assert_eq!(used.status, TicketStatus::Used);
        assert_eq!(available(&f), 8);

        let err = f
            .service
            .update_ticket_status(ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidState(InvalidStateReason::IllegalTransition {
                from: TicketStatus::Used,
                to: TicketStatus::Cancelled,
            })
        ));
        assert_eq!(available(&f), 8);
    }

    #[tokio::test]
    async fn test_update_status_to_cancelled_returns_capacity() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 4)
            .await
            .unwrap()
            .ticket;

        let cancelled = f
            .service
            .update_ticket_status(ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TicketStatus::Cancelled);
        assert_eq!(available(&f), 10);
    }

    #[tokio::test]
    async fn test_update_status_respects_cancellation_window() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 4)
            .await
            .unwrap()
            .ticket;
        f.clock.advance(Duration::hours(2));

        let err = f
            .service
            .update_ticket_status(ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "too_close_to_event");
        assert_eq!(available(&f), 6);
    }

    #[tokio::test]
    async fn test_update_status_rejects_other_targets() {
        let f = fixture(10, 5000, Duration::hours(3));
        let ticket = f
            .service
            .purchase_ticket(f.user.id, f.event.id, 1)
            .await
            .unwrap()
            .ticket;

        for target in [TicketStatus::Active, TicketStatus::Expired] {
            let err = f
                .service
                .update_ticket_status(ticket.id, target)
                .await
                .unwrap_err();
            assert_eq!(err.code(), "illegal_transition");
        }
        assert_eq!(f.store.ticket(ticket.id).unwrap().status, TicketStatus::Active);
    }
}
