//! Global send-admission control over two sliding windows.
//!
//! A single counter row tracks sends for the current calendar day and the
//! current hour bucket. Window resets are logical: when the stored day or
//! hour no longer matches the instant of the reserve call, the
//! corresponding counter reads as zero — there is no cleanup job.
//!
//! Reservation happens *before* any send is attempted, so quota is
//! conservatively consumed even if sends later fail. The engine prefers
//! under-sending to over-sending; a reservation is never released.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use courier_common::quota::{Admission, QuotaLimits, QuotaState, hour_bucket};
use courier_store::QuotaStore;

use crate::DeliveryError;

/// Admission-control gate shared by all dispatch paths.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: QuotaLimits,
    store: Arc<dyn QuotaStore>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limits: QuotaLimits, store: Arc<dyn QuotaStore>) -> Self {
        Self { limits, store }
    }

    /// Reserve admission for up to `requested` sends now.
    ///
    /// # Errors
    /// `DeliveryError::Store` when the counter row cannot be read or
    /// written.
    pub async fn reserve(&self, requested: u32) -> Result<Admission, DeliveryError> {
        self.reserve_at(requested, Utc::now()).await
    }

    /// Reserve admission as of an explicit instant.
    ///
    /// `allow_count = min(requested, daily_remaining, hourly_remaining)`;
    /// the updated counters are written back in one store call before the
    /// caller sends anything.
    ///
    /// # Errors
    /// `DeliveryError::Store` when the counter row cannot be read or
    /// written.
    pub async fn reserve_at(
        &self,
        requested: u32,
        now: DateTime<Utc>,
    ) -> Result<Admission, DeliveryError> {
        let (Some(hourly), Some(daily)) = (self.limits.hourly, self.limits.daily) else {
            // Unconfigured limits refuse all admission rather than sending
            // unbounded.
            tracing::warn!("send limits not configured; refusing admission");
            return Ok(Admission::denied());
        };

        let today = now.date_naive();
        let bucket = hour_bucket(now);

        let state = self.store.load_quota().await?;
        let (sent_today, sent_this_hour) = state.map_or((0, 0), |s| {
            (
                if s.day == today { s.sent_today } else { 0 },
                if s.hour_bucket == bucket {
                    s.sent_this_hour
                } else {
                    0
                },
            )
        });

        let daily_remaining = daily.saturating_sub(sent_today);
        let hourly_remaining = hourly.saturating_sub(sent_this_hour);
        let allow_count = requested.min(daily_remaining).min(hourly_remaining);

        if allow_count == 0 {
            tracing::info!(
                requested,
                daily_remaining,
                hourly_remaining,
                "admission denied: quota exhausted"
            );
            return Ok(Admission::denied());
        }

        self.store
            .store_quota(QuotaState {
                day: today,
                hour_bucket: bucket,
                sent_today: sent_today + allow_count,
                sent_this_hour: sent_this_hour + allow_count,
            })
            .await?;

        tracing::debug!(requested, allow_count, "admission reserved");
        Ok(Admission {
            allowed: true,
            allow_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use courier_store::MemoryStore;

    use super::*;

    fn limiter(hourly: u32, daily: u32) -> (RateLimiter, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let limits = QuotaLimits {
            hourly: Some(hourly),
            daily: Some(daily),
        };
        (RateLimiter::new(limits, store.clone()), store)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).single().unwrap()
    }

    #[tokio::test]
    async fn full_admission_within_both_windows() {
        let (limiter, store) = limiter(200, 2000);

        let admission = limiter.reserve_at(120, at(10, 0)).await.unwrap();
        assert!(admission.allowed);
        assert_eq!(admission.allow_count, 120);

        let state = store.load_quota().await.unwrap().unwrap();
        assert_eq!(state.sent_today, 120);
        assert_eq!(state.sent_this_hour, 120);
    }

    #[tokio::test]
    async fn admission_is_clamped_by_tightest_window() {
        let (limiter, _) = limiter(200, 50);

        let admission = limiter.reserve_at(110, at(10, 0)).await.unwrap();
        assert!(admission.allowed);
        assert_eq!(admission.allow_count, 50);
    }

    #[tokio::test]
    async fn counters_never_exceed_limits_across_calls() {
        let (limiter, store) = limiter(100, 1000);

        let mut admitted = 0;
        for _ in 0..10 {
            let admission = limiter.reserve_at(30, at(10, 0)).await.unwrap();
            admitted += admission.allow_count;
        }

        assert_eq!(admitted, 100);
        let state = store.load_quota().await.unwrap().unwrap();
        assert_eq!(state.sent_this_hour, 100);

        // The eleventh call is denied outright.
        let admission = limiter.reserve_at(1, at(10, 30)).await.unwrap();
        assert!(!admission.allowed);
        assert_eq!(admission.allow_count, 0);
    }

    #[tokio::test]
    async fn hour_boundary_resets_hourly_counter_only() {
        let (limiter, store) = limiter(100, 1000);

        limiter.reserve_at(100, at(10, 15)).await.unwrap();
        assert!(!limiter.reserve_at(1, at(10, 59)).await.unwrap().allowed);

        // The next hour bucket starts fresh without any reset operation.
        let admission = limiter.reserve_at(40, at(11, 0)).await.unwrap();
        assert_eq!(admission.allow_count, 40);

        let state = store.load_quota().await.unwrap().unwrap();
        assert_eq!(state.sent_this_hour, 40);
        // The daily counter kept accumulating.
        assert_eq!(state.sent_today, 140);
    }

    #[tokio::test]
    async fn day_boundary_resets_daily_counter() {
        let (limiter, store) = limiter(5000, 2000);

        limiter.reserve_at(2000, at(10, 0)).await.unwrap();
        assert!(!limiter.reserve_at(1, at(23, 59)).await.unwrap().allowed);

        let next_day = at(23, 59) + TimeDelta::minutes(1);
        let admission = limiter.reserve_at(10, next_day).await.unwrap();
        assert_eq!(admission.allow_count, 10);

        let state = store.load_quota().await.unwrap().unwrap();
        assert_eq!(state.day, next_day.date_naive());
        assert_eq!(state.sent_today, 10);
    }

    #[tokio::test]
    async fn unconfigured_limits_refuse_all_admission() {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(QuotaLimits::default(), store.clone());

        let admission = limiter.reserve_at(1, at(10, 0)).await.unwrap();
        assert!(!admission.allowed);
        // No reservation is written.
        assert!(store.load_quota().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn denied_admission_writes_nothing() {
        let (limiter, store) = limiter(10, 10);

        limiter.reserve_at(10, at(10, 0)).await.unwrap();
        let before = store.load_quota().await.unwrap().unwrap();

        assert!(!limiter.reserve_at(5, at(10, 1)).await.unwrap().allowed);
        let after = store.load_quota().await.unwrap().unwrap();
        assert_eq!(before, after);
    }
}
