//! Aggregate rows for sales reports.

use sqlx::FromRow;
use uuid::Uuid;

/// Per-event sales aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct EventReportRow {
    pub event_id: Uuid,
    pub event_name: String,
    pub capacity: i32,
    pub available: i32,
    pub tickets_sold: i64,
    pub revenue_cents: i64,
}

impl From<EventReportRow> for domain::models::EventReport {
    fn from(row: EventReportRow) -> Self {
        Self {
            event_id: row.event_id,
            event_name: row.event_name,
            tickets_sold: row.tickets_sold,
            revenue_cents: row.revenue_cents,
            capacity: row.capacity,
            available: row.available,
            sales_rate: domain::models::sales_rate(row.tickets_sold, row.capacity),
        }
    }
}

/// Catalogue-wide totals.
#[derive(Debug, Clone, FromRow)]
pub struct SalesSummaryRow {
    pub total_tickets_sold: i64,
    pub total_revenue_cents: i64,
    pub total_events: i64,
    pub active_events: i64,
    pub total_users: i64,
}
