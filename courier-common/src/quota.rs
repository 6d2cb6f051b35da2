//! Global quota counters and admission results.

use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// The instant truncated to its hour bucket.
#[must_use]
pub fn hour_bucket(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now)
}

/// Persisted send counters for the two sliding windows.
///
/// A single logical row, mutated only by the rate limiter's reserve
/// operation. Window resets are logical: a stored `day` or `hour_bucket`
/// that no longer matches the current instant means the corresponding
/// counter reads as zero — no cleanup job ever runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Calendar date the `sent_today` counter belongs to.
    pub day: NaiveDate,
    /// Hour bucket the `sent_this_hour` counter belongs to.
    pub hour_bucket: DateTime<Utc>,
    pub sent_today: u32,
    pub sent_this_hour: u32,
}

impl QuotaState {
    /// Zeroed counters for the windows containing `now`.
    #[must_use]
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            hour_bucket: hour_bucket(now),
            sent_today: 0,
            sent_this_hour: 0,
        }
    }
}

/// Configured throughput ceilings.
///
/// Both limits must be present for any admission to be granted; an
/// unconfigured engine refuses all sends rather than sending unbounded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Maximum sends per hour bucket.
    #[serde(default)]
    pub hourly: Option<u32>,
    /// Maximum sends per calendar day.
    #[serde(default)]
    pub daily: Option<u32>,
}

impl QuotaLimits {
    #[must_use]
    pub const fn configured(&self) -> bool {
        self.hourly.is_some() && self.daily.is_some()
    }
}

/// Result of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    /// Whether any sends were admitted.
    pub allowed: bool,
    /// How many sends were admitted (possibly fewer than requested).
    pub allow_count: u32,
}

impl Admission {
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            allowed: false,
            allow_count: 0,
        }
    }
}

impl std::fmt::Display for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.allowed {
            write!(f, "admitted {}", self.allow_count)
        } else {
            f.write_str("denied")
        }
    }
}
