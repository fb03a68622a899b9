//! Backoff policy for rate-limited (HTTP 429) responses.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Bounded retry schedule for rate-limited responses.
///
/// Only 429 is retried; every other non-2xx status is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first request.
    pub max_retries: u32,
    /// Delay before retry N (the last entry repeats).
    pub backoff: Vec<Duration>,
    /// Ceiling applied to server-provided `Retry-After` values.
    pub retry_after_cap: Duration,
    /// Minimum pacing penalty applied on every 429.
    pub penalty_floor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: vec![
                Duration::from_millis(350),
                Duration::from_millis(800),
                Duration::from_millis(1500),
            ],
            retry_after_cap: Duration::from_secs(4),
            penalty_floor: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    ///
    /// A parseable `Retry-After` wins, clamped to `retry_after_cap`;
    /// otherwise the fixed schedule applies.
    pub fn delay_for(&self, retry: u32, retry_after: Option<&str>, now: DateTime<Utc>) -> Duration {
        if let Some(delay) = retry_after.and_then(|v| parse_retry_after(v, now)) {
            return delay.min(self.retry_after_cap);
        }
        self.backoff
            .get(retry as usize)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(self.penalty_floor)
    }

    /// Pacing penalty for a 429 whose retry delay is `delay`.
    pub fn penalty(&self, delay: Duration) -> Duration {
        delay.max(self.penalty_floor)
    }
}

/// Parse a `Retry-After` header: delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_nan() || secs < 0.0 {
            return None;
        }
        // Values too large for a Duration saturate; callers clamp anyway.
        return Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
