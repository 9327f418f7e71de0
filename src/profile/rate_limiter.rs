// Interval rate limiter for profile lookups.
//
// The profile API enforces a per-app request budget. Each lookup waits for
// its slot: slots are spaced `1 / requests_per_second` apart, shared by all
// concurrent resolver tasks.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    /// Minimum time between requests (zero = unlimited)
    interval: Duration,
    /// When the last request was allowed through
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Allow `requests_per_second` lookups per second.
    /// A non-positive rate disables limiting.
    pub fn per_second(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                last_request: None,
            })),
        }
    }

    pub fn unlimited() -> Self {
        Self::per_second(0.0)
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;
        if inner.interval.is_zero() {
            return;
        }

        let now = Instant::now();
        // Reserve the slot before sleeping so waiters queue up behind it
        let slot = match inner.last_request {
            Some(last) if now.duration_since(last) < inner.interval => last + inner.interval,
            _ => now,
        };
        inner.last_request = Some(slot);
        drop(inner);

        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::per_second(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_request_waits_for_slot() {
        let limiter = RateLimiter::per_second(4.0); // 250ms between requests
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(200),
            "Expected ~250ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..20 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
