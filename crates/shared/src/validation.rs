//! Common validation utilities for booking inputs.

use chrono::{DateTime, Duration, Utc};

/// Whether a purchase quantity is at least 1 and at most `max`.
pub fn quantity_in_range(quantity: i32, max: i32) -> bool {
    (1..=max).contains(&quantity)
}

/// Returns true while `event_date` is at least `cutoff` away from `now`.
///
/// An event starting exactly at `now + cutoff` is still inside the window.
pub fn booking_window_open(
    event_date: DateTime<Utc>,
    now: DateTime<Utc>,
    cutoff: Duration,
) -> bool {
    event_date >= now + cutoff
}

/// Multiplies a unit price by a quantity, returning `None` on overflow.
pub fn total_price_cents(unit_price_cents: i64, quantity: i32) -> Option<i64> {
    unit_price_cents.checked_mul(i64::from(quantity))
}
