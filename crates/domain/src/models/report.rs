//! Read-only sales reports over committed ticket and event state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Sales figures for a single event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventReport {
    pub event_id: Uuid,
    pub event_name: String,
    /// Units held by active or used tickets.
    pub tickets_sold: i64,
    pub revenue_cents: i64,
    pub capacity: i32,
    pub available: i32,
    /// Percentage of capacity sold.
    pub sales_rate: f64,
}

/// Totals across the whole catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SalesSummary {
    pub total_tickets_sold: i64,
    pub total_revenue_cents: i64,
    pub total_events: i64,
    pub active_events: i64,
    pub total_users: i64,
    pub generated_at: DateTime<Utc>,
}

/// Percentage of `capacity` covered by `sold`; zero when capacity is zero.
pub fn sales_rate(sold: i64, capacity: i32) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    (sold as f64 / f64::from(capacity)) * 100.0
}
