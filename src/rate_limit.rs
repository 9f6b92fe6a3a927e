use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Configuration for the request-rate ceiling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted within any rolling window.
    pub max_requests_per_window: usize,
    /// Duration of the rolling window.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            // 1 req/sec average; short bursts allowed within the window.
            max_requests_per_window: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding-window rate limiter over request timestamps.
///
/// One instance guards the whole process; the caller contract is a single
/// in-flight request at a time, so no locking is done here. The window is a
/// rolling count, not calendar-aligned buckets.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            window: VecDeque::new(),
        }
    }

    /// Admit or reject a request at time `now`.
    ///
    /// Prunes timestamps that have aged out of the window, then checks the
    /// ceiling. A rejected request is not recorded, so rejections never
    /// extend the window occupancy.
    pub fn admit(&mut self, now: Instant) -> bool {
        while self
            .window
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.config.window)
        {
            self.window.pop_front();
        }

        if self.window.len() >= self.config.max_requests_per_window {
            return false;
        }

        self.window.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(RateLimitConfig::default())
    }
}
