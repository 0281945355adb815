//! Ticket repository for read-side queries.
//!
//! Nothing here takes row locks or writes; booking mutations go through
//! [`PgBookingStore`](super::PgBookingStore).

use chrono::Utc;
use domain::models::{EventReport, SalesSummary, Ticket, TicketDetails, TicketPage};
use shared::pagination::{clamp_limit, decode_cursor, encode_cursor};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{EventReportRow, SalesSummaryRow, TicketEntity, TicketWithContextEntity};
use crate::error::TicketQueryError;
use crate::metrics::QueryTimer;

/// Repository for ticket read operations.
#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    /// Creates a new TicketRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a ticket by ID.
    pub async fn find_by_id(&self, ticket_id: Uuid) -> Result<Option<TicketEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ticket_by_id");
        let result = sqlx::query_as::<_, TicketEntity>(
            r#"
            SELECT id, user_id, event_id, quantity, total_price_cents, status,
                   purchase_date, created_at, updated_at
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a ticket together with its event name/date and owner name/email.
    pub async fn find_with_context(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<TicketDetails>, sqlx::Error> {
        let timer = QueryTimer::new("find_ticket_with_context");
        let result = sqlx::query_as::<_, TicketWithContextEntity>(
            r#"
            SELECT t.id, t.user_id, t.event_id, t.quantity, t.total_price_cents, t.status,
                   t.purchase_date, t.created_at, t.updated_at,
                   e.name AS event_name, e.event_date, e.status AS event_status,
                   u.name AS user_name, u.email AS user_email
            FROM tickets t
            LEFT JOIN events e ON e.id = t.event_id
            LEFT JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// List a user's tickets, newest purchase first.
    ///
    /// `cursor` is the `next_cursor` of the previous page. `limit` defaults to
    /// 10 and is capped at 100.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<TicketPage, TicketQueryError> {
        let limit = clamp_limit(limit);
        let (cursor_date, cursor_id) = match cursor {
            Some(c) => {
                let (date, id) = decode_cursor(c)?;
                (Some(date), Some(id))
            }
            None => (None, None),
        };

        let timer = QueryTimer::new("list_tickets_for_user");
        let mut rows = sqlx::query_as::<_, TicketEntity>(
            r#"
            SELECT id, user_id, event_id, quantity, total_price_cents, status,
                   purchase_date, created_at, updated_at
            FROM tickets
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR (purchase_date, id) < ($2, $3))
            ORDER BY purchase_date DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(cursor_date)
        .bind(cursor_id.unwrap_or_else(|| Uuid::from_bytes([0xff; 16])))
        .bind(limit + 1)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let has_more = rows.len() as i64 > limit;
        if has_more {
            rows.pop();
        }
        let data: Vec<Ticket> = rows.into_iter().map(Into::into).collect();
        let next_cursor = if has_more {
            data.last().map(|t| encode_cursor(t.purchase_date, t.id))
        } else {
            None
        };

        Ok(TicketPage { data, next_cursor })
    }

    /// Sales report for one event; `None` when the event does not exist.
    ///
    /// Units and revenue count active and used tickets.
    pub async fn event_report(&self, event_id: Uuid) -> Result<Option<EventReport>, sqlx::Error> {
        let timer = QueryTimer::new("event_sales_report");
        let result = sqlx::query_as::<_, EventReportRow>(
            r#"
            SELECT e.id AS event_id, e.name AS event_name, e.capacity, e.available,
                   COALESCE(SUM(t.quantity), 0)::BIGINT AS tickets_sold,
                   COALESCE(SUM(t.total_price_cents), 0)::BIGINT AS revenue_cents
            FROM events e
            LEFT JOIN tickets t
                   ON t.event_id = e.id AND t.status IN ('active', 'used')
            WHERE e.id = $1
            GROUP BY e.id
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Totals across all events, tickets and users.
    pub async fn summary(&self) -> Result<SalesSummary, sqlx::Error> {
        let timer = QueryTimer::new("sales_summary");
        let row = sqlx::query_as::<_, SalesSummaryRow>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(quantity), 0)::BIGINT
                   FROM tickets WHERE status IN ('active', 'used')) AS total_tickets_sold,
                (SELECT COALESCE(SUM(total_price_cents), 0)::BIGINT
                   FROM tickets WHERE status IN ('active', 'used')) AS total_revenue_cents,
                (SELECT COUNT(*) FROM events) AS total_events,
                (SELECT COUNT(*) FROM events WHERE status = 'active') AS active_events,
                (SELECT COUNT(*) FROM users) AS total_users
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        let row = row?;

        Ok(SalesSummary {
            total_tickets_sold: row.total_tickets_sold,
            total_revenue_cents: row.total_revenue_cents,
            total_events: row.total_events,
            active_events: row.active_events,
            total_users: row.total_users,
            generated_at: Utc::now(),
        })
    }
}
