//! PostgreSQL booking store.
//!
//! Each booking unit is one database transaction. Rows are locked with
//! `SELECT ... FOR UPDATE`, and the transaction-local `lock_timeout` bounds how
//! long a unit waits for a lock held by another one. Dropping a
//! [`PgBookingTransaction`] without committing rolls it back.

use async_trait::async_trait;
use domain::models::{Event, NewTicket, Ticket, TicketDetails, User};
use domain::services::{BookingStore, BookingTransaction};
use domain::StoreError;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use super::ticket::TicketRepository;
use crate::entities::{EventEntity, TicketEntity, TicketStatusDb, UserEntity};
use crate::error::map_sqlx_error;
use crate::metrics::QueryTimer;

/// Booking store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
    lock_timeout: Duration,
    tickets: TicketRepository,
}

impl PgBookingStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            tickets: TicketRepository::new(pool.clone()),
            pool,
            lock_timeout,
        }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    type Tx = PgBookingTransaction;

    async fn begin(&self) -> Result<PgBookingTransaction, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // is_local = true scopes the setting to this transaction.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(PgBookingTransaction { tx })
    }

    async fn ticket_details(&self, ticket: Ticket) -> Result<TicketDetails, StoreError> {
        let details = self
            .tickets
            .find_with_context(ticket.id)
            .await
            .map_err(map_sqlx_error)?;
        Ok(details.unwrap_or_else(|| TicketDetails::bare(ticket)))
    }
}

/// One open booking transaction.
pub struct PgBookingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTransaction for PgBookingTransaction {
    async fn get_user(&mut self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, name, email, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn get_event_for_update(&mut self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let timer = QueryTimer::new("lock_event_row");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, name, capacity, available, price_cents, status,
                   event_date, created_at, updated_at
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn adjust_available(&mut self, event_id: Uuid, delta: i32) -> Result<i32, StoreError> {
        let timer = QueryTimer::new("adjust_event_available");
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE events
            SET available = available + $2, updated_at = NOW()
            WHERE id = $1 AND available + $2 BETWEEN 0 AND capacity
            RETURNING available
            "#,
        )
        .bind(event_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await;
        timer.record();

        match result.map_err(map_sqlx_error)? {
            Some(available) => Ok(available),
            None => {
                tracing::error!(%event_id, delta, "Capacity guard rejected adjustment");
                Err(StoreError::Backend(format!(
                    "adjusting available by {} would leave event {} out of range",
                    delta, event_id
                )))
            }
        }
    }

    async fn create_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let timer = QueryTimer::new("insert_ticket");
        let result = sqlx::query_as::<_, TicketEntity>(
            r#"
            INSERT INTO tickets (user_id, event_id, quantity, total_price_cents, status, purchase_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, event_id, quantity, total_price_cents, status,
                      purchase_date, created_at, updated_at
            "#,
        )
        .bind(ticket.user_id)
        .bind(ticket.event_id)
        .bind(ticket.quantity)
        .bind(ticket.total_price_cents)
        .bind(TicketStatusDb::Active)
        .bind(ticket.purchase_date)
        .fetch_one(&mut *self.tx)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.into())
    }

    async fn get_ticket_for_update(
        &mut self,
        ticket_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError> {
        let timer = QueryTimer::new("lock_ticket_row");
        let result = sqlx::query_as::<_, TicketEntity>(
            r#"
            SELECT id, user_id, event_id, quantity, total_price_cents, status,
                   purchase_date, created_at, updated_at
            FROM tickets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&mut *self.tx)
        .await;
        timer.record();
        Ok(result.map_err(map_sqlx_error)?.map(Into::into))
    }

    async fn save_ticket(&mut self, ticket: &Ticket) -> Result<(), StoreError> {
        let timer = QueryTimer::new("update_ticket_status");
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(TicketStatusDb::from(ticket.status))
        .execute(&mut *self.tx)
        .await;
        timer.record();

        if result.map_err(map_sqlx_error)?.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "ticket {} vanished while locked",
                ticket.id
            )));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
