//! Token bucket rate limiter for provider request throttling.
//!
//! Proactively spaces requests so the upstream APIs never see a burst above
//! their published budget. Tokens refill continuously at
//! `requests_per_minute / 60s`; `acquire` suspends (never spins) until a
//! token is available.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    /// Fractional tokens currently available
    tokens: f64,
    /// Last refill timestamp
    last_refill: Instant,
}

/// A token bucket rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens the bucket holds (burst size)
    capacity: f64,
    /// Tokens added per second
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
    /// Name for logging
    name: String,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `requests_per_minute` requests.
    ///
    /// The burst capacity is one second's worth of budget (at least 1), so a
    /// full minute's allowance can never be spent instantaneously.
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let refill_per_sec = f64::from(requests_per_minute.max(1)) / 60.0;
        let capacity = refill_per_sec.ceil().max(1.0);

        Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            name: name.into(),
        }
    }

    /// Acquire a token, suspending until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                // Time until one full token accrues
                let deficit = 1.0 - bucket.tokens;
                Duration::from_secs_f64(deficit / self.refill_per_sec)
            };

            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for token"
            );

            tokio::time::sleep(wait).await;
        }
    }

    /// Try to acquire a token without waiting.
    pub fn try_acquire(&self) -> bool {
        match self.bucket.try_lock() {
            Ok(mut bucket) => {
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            bucket.last_refill = now;
        }
    }

    /// Configured burst capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_rpm() {
        // 300 req/min = 5 req/sec burst
        let limiter = RateLimiter::new("test", 300);
        assert_eq!(limiter.capacity(), 5);

        // Tiny budgets still allow a single-token burst
        let limiter = RateLimiter::new("test", 6);
        assert_eq!(limiter.capacity(), 1);
    }

    #[test]
    fn test_try_acquire_exhausts() {
        let limiter = RateLimiter::new("test", 60); // 1 token burst
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new("test", 6000); // 100 tokens/sec

        // Drain the burst
        while limiter.try_acquire() {}

        // acquire must suspend briefly and then succeed
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
