//! Rate-limit retry policy for CryptoCompare queries.
//!
//! CryptoCompare signals rate limiting inside an HTTP 200 payload, so the
//! policy here is about payload inspection, not status codes. The backoff
//! schedule is fixed and reproducible rather than exponential-with-jitter:
//! the first wait is the longest and each further retry waits less, draining
//! a bounded budget instead of looping forever.

use std::time::Duration;

/// Message CryptoCompare puts in the payload when a key is over its limit.
pub const RATE_LIMIT_MSG: &str = "You are over your rate limit please upgrade your account!";

/// Bounded, strictly-decreasing backoff for rate-limited queries.
#[derive(Debug, Clone)]
pub struct RateLimitBackoff {
    /// Total retries allowed per logical query.
    pub max_retries: u32,
    /// Numerator of the `base / attempt` wait schedule.
    pub base: Duration,
}

impl Default for RateLimitBackoff {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base: Duration::from_secs(20),
        }
    }
}

impl RateLimitBackoff {
    /// Wait before the given retry. `attempt` is 1-based and counts the
    /// retries already spent plus this one, so waits shrink as the budget
    /// drains: 20s, 10s, 6.67s, ... 2s for the defaults.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        debug_assert!(attempt >= 1 && attempt <= self.max_retries);
        Duration::from_secs_f64(self.base.as_secs_f64() / f64::from(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_ten_retries() {
        assert_eq!(RateLimitBackoff::default().max_retries, 10);
    }

    #[test]
    fn test_delays_are_strictly_decreasing() {
        let backoff = RateLimitBackoff::default();
        let delays: Vec<Duration> = (1..=backoff.max_retries)
            .map(|n| backoff.delay_for_attempt(n))
            .collect();
        assert_eq!(delays.len(), 10);
        for pair in delays.windows(2) {
            assert!(pair[0] > pair[1], "expected {:?} > {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_delay_endpoints() {
        let backoff = RateLimitBackoff::default();
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(20));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(2));
    }
}
