//! Wiring of the booking service onto PostgreSQL.

use domain::services::{BookingPolicy, BookingService};
use persistence::{PgBookingStore, TicketRepository};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::jobs::{JobRunner, PoolMetricsJob, SalesReportJob};

/// Everything a caller needs to run booking operations and queries.
#[derive(Clone)]
pub struct AppContext {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub booking: Arc<BookingService<PgBookingStore>>,
    pub tickets: TicketRepository,
}

impl AppContext {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let lock_timeout = persistence::db::DatabaseConfig::from(&config.database).lock_timeout();
        let store = PgBookingStore::new(pool.clone(), lock_timeout);
        let policy = BookingPolicy::from(&config.booking);

        Self {
            booking: Arc::new(BookingService::new(store, policy)),
            tickets: TicketRepository::new(pool.clone()),
            config: Arc::new(config),
            pool,
        }
    }

    /// Runner with the standard background jobs registered, not yet started.
    pub fn jobs(&self) -> JobRunner {
        let mut jobs = JobRunner::new();
        jobs.register(PoolMetricsJob::new(self.pool.clone()));
        jobs.register(SalesReportJob::new(self.tickets.clone()));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_context_applies_booking_config() {
        let config = Config::load_for_test(&[
            ("database.url", "postgres://localhost/unused"),
            ("booking.cancellation_cutoff_minutes", "45"),
        ])
        .expect("Failed to load config");
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");

        let ctx = AppContext::new(config, pool);
        assert_eq!(
            ctx.booking.policy().cancellation_cutoff,
            chrono::Duration::minutes(45)
        );
        assert_eq!(
            ctx.booking.policy().purchase_cutoff,
            chrono::Duration::hours(1)
        );
    }
}
