//! Client-side request throttle

use governor::{DefaultDirectRateLimiter, Quota};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Token bucket shared by every request of a run
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    /// Allow `requests_per_second`, bursting up to one second's worth.
    /// Zero is treated as one.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: Arc::new(governor::RateLimiter::direct(Quota::per_second(rate))),
        }
    }

    /// Wait for the next free slot
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RateLimiter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_burst_then_steady_rate() {
        let limiter = RateLimiter::per_second(2);
        let started = Instant::now();

        limiter.wait().await;
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_millis(200));

        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
