//! Common test utilities for PostgreSQL integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// Connect to `TEST_DATABASE_URL` and bring the schema up to date.
///
/// Returns `None` when the variable is unset so the calling test can skip.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Insert a user with a generated name and a unique email.
pub async fn insert_user(pool: &PgPool, is_active: bool) -> Uuid {
    let name: String = Name().fake();
    let email = format!("test_{}@example.com", Uuid::new_v4());

    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, email, is_active) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .expect("Failed to insert test user")
}

/// Insert an active event with its whole capacity available.
pub async fn insert_event(
    pool: &PgPool,
    capacity: i32,
    price_cents: i64,
    event_date: DateTime<Utc>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO events (name, capacity, available, price_cents, event_date)
        VALUES ($1, $2, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(format!("Test Event {}", Uuid::new_v4()))
    .bind(capacity)
    .bind(price_cents)
    .bind(event_date)
    .fetch_one(pool)
    .await
    .expect("Failed to insert test event")
}

pub async fn available(pool: &PgPool, event_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT available FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read available")
}

/// Units held by active or used tickets of an event.
pub async fn held_quantity(pool: &PgPool, event_id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(quantity), 0)::BIGINT
        FROM tickets
        WHERE event_id = $1 AND status IN ('active', 'used')
        "#,
    )
    .bind(event_id)
    .fetch_one(pool)
    .await
    .expect("Failed to sum held quantity") as i32
}

pub async fn ticket_count(pool: &PgPool, event_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count tickets")
}
