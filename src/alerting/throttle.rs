//! Alert cooldown tracker

use chrono::{DateTime, Duration, Utc};

/// Enforces a minimum wall-clock gap between two successful alerts.
///
/// Only a confirmed delivery moves the window; failed attempts leave it
/// untouched so the next tick may try again immediately.
#[derive(Debug, Clone)]
pub struct AlertThrottler {
    cooldown: Duration,
    last_notification: Option<DateTime<Utc>>,
}

impl AlertThrottler {
    /// Create a throttler with the given cooldown in seconds.
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: i64::try_from(cooldown_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            last_notification: None,
        }
    }

    /// Whether an alert may be attempted at `now`.
    ///
    /// Returns true if no alert was ever delivered, or at least one cooldown
    /// has elapsed since the last delivery. A clock that went backwards
    /// refuses.
    pub fn should_notify(&self, now: DateTime<Utc>) -> bool {
        match self.last_notification {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.cooldown,
        }
    }

    /// Time left in the current window, if any.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_notification?;
        let left = self.cooldown.checked_sub(&now.signed_duration_since(last))?;
        (left > Duration::zero()).then_some(left)
    }

    /// Record a confirmed delivery at `now`.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_notification = Some(now);
    }

    pub fn last_notification(&self) -> Option<DateTime<Utc>> {
        self.last_notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap()
    }

    #[test]
    fn allows_first_alert() {
        let throttler = AlertThrottler::new(30);
        assert!(throttler.should_notify(t0()));
        assert!(throttler.remaining(t0()).is_none());
    }

    #[test]
    fn suppresses_inside_cooldown() {
        let mut throttler = AlertThrottler::new(30);
        throttler.record_success(t0());
        for offset in [0, 1, 15, 29] {
            assert!(
                !throttler.should_notify(t0() + Duration::seconds(offset)),
                "offset {offset}s should be suppressed"
            );
        }
        assert_eq!(
            throttler.remaining(t0() + Duration::seconds(10)),
            Some(Duration::seconds(20))
        );
    }

    #[test]
    fn suppresses_just_before_boundary() {
        let mut throttler = AlertThrottler::new(30);
        throttler.record_success(t0());
        assert!(!throttler.should_notify(t0() + Duration::milliseconds(29_999)));
    }

    #[test]
    fn allows_at_and_after_cooldown() {
        let mut throttler = AlertThrottler::new(30);
        throttler.record_success(t0());
        for offset in [30, 31, 3600] {
            assert!(throttler.should_notify(t0() + Duration::seconds(offset)));
        }
    }

    #[test]
    fn refuses_when_clock_goes_backwards() {
        let mut throttler = AlertThrottler::new(30);
        throttler.record_success(t0());
        assert!(!throttler.should_notify(t0() - Duration::seconds(120)));
    }

    #[test]
    fn window_restarts_from_latest_success() {
        let mut throttler = AlertThrottler::new(30);
        throttler.record_success(t0());
        throttler.record_success(t0() + Duration::seconds(40));
        assert!(!throttler.should_notify(t0() + Duration::seconds(60)));
        assert!(throttler.should_notify(t0() + Duration::seconds(70)));
    }
}
