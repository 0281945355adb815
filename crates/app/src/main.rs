use anyhow::Result;
use std::time::Duration;
use tracing::info;

use ticketing_app::app::AppContext;
use ticketing_app::config::Config;
use ticketing_app::{logging, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    logging::init_logging(&config.logging)?;

    info!("Starting ticketing service v{}", env!("CARGO_PKG_VERSION"));

    metrics::init_metrics(&config.metrics)?;

    let db_config = persistence::db::DatabaseConfig::from(&config.database);
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let ctx = AppContext::new(config, pool);

    let mut jobs = ctx.jobs();
    jobs.start();

    info!(
        lock_timeout_ms = ctx.config.database.lock_timeout_ms,
        "Booking service ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    jobs.shutdown(Duration::from_secs(10)).await;
    ctx.pool.close().await;

    Ok(())
}
