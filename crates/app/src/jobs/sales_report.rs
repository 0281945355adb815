//! Background job publishing catalogue-wide sales totals.

use anyhow::Context;
use metrics::gauge;
use persistence::TicketRepository;
use std::time::Duration;
use tracing::info;

use super::runner::Job;

/// Periodically reads the sales summary, exports it as gauges and logs it.
pub struct SalesReportJob {
    tickets: TicketRepository,
}

impl SalesReportJob {
    pub fn new(tickets: TicketRepository) -> Self {
        Self { tickets }
    }
}

#[async_trait::async_trait]
impl Job for SalesReportJob {
    fn name(&self) -> &'static str {
        "sales_report"
    }

    fn period(&self) -> Duration {
        Duration::from_secs(300)
    }

    fn run_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn run(&self) -> anyhow::Result<()> {
        let summary = self
            .tickets
            .summary()
            .await
            .context("Failed to read sales summary")?;

        gauge!("booking_tickets_held").set(summary.total_tickets_sold as f64);
        gauge!("booking_revenue_cents").set(summary.total_revenue_cents as f64);
        gauge!("booking_active_events").set(summary.active_events as f64);

        info!(
            tickets_sold = summary.total_tickets_sold,
            revenue_cents = summary.total_revenue_cents,
            active_events = summary.active_events,
            total_events = summary.total_events,
            total_users = summary.total_users,
            "Sales summary"
        );
        Ok(())
    }
}
