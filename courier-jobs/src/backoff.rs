//! Quadratic retry backoff for failed jobs.

use chrono::{DateTime, TimeDelta, Utc};

/// Cap on the backoff delay: 24 hours.
const MAX_BACKOFF_MINUTES: u32 = 24 * 60;

/// Backoff delay in minutes for the given attempt count.
///
/// # Formula
/// `delay = min(attempts², 1440)` minutes, with saturating arithmetic so
/// absurd attempt counts cannot overflow.
#[must_use]
pub fn backoff_minutes(attempts: u32) -> u32 {
    attempts.saturating_mul(attempts).min(MAX_BACKOFF_MINUTES)
}

/// When a job that has failed `attempts` times may next be claimed.
#[must_use]
pub fn next_run_at(attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + TimeDelta::minutes(i64::from(backoff_minutes(attempts)))
}
