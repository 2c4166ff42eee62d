use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub burst: u32,
    /// One token comes back per `refill`.
    pub refill: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            burst: 30,
            refill: Duration::from_secs(2),
        }
    }
}

/// Token bucket guarding one connection's inbound envelopes.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::from_limit(RateLimit::default())
    }

    pub fn from_limit(limit: RateLimit) -> Self {
        Self::new_with_limits(limit.burst, limit.refill)
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub fn check_rate_limit(&mut self) -> bool {
        self.check_rate_limit_at(Instant::now())
    }

    pub fn check_rate_limit_at(&mut self, now: Instant) -> bool {
        self.refill_tokens(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self, now: Instant) {
        if self.refill_rate.is_zero() {
            self.tokens = self.max_tokens;
            return;
        }

        let time_passed = now.saturating_duration_since(self.last_refill);
        let periods = time_passed.as_nanos() / self.refill_rate.as_nanos();
        if periods == 0 {
            return;
        }

        let tokens_to_add = u32::try_from(periods).unwrap_or(u32::MAX);
        self.tokens = self.tokens.saturating_add(tokens_to_add).min(self.max_tokens);
        // Keep the partial period so slow trickles still earn tokens
        self.last_refill += self.refill_rate * tokens_to_add;
    }

    pub fn get_remaining_tokens(&mut self) -> u32 {
        self.refill_tokens(Instant::now());
        self.tokens
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_refuse() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(2));
        let start = limiter.last_refill;

        for _ in 0..3 {
            assert!(limiter.check_rate_limit_at(start));
        }
        assert!(!limiter.check_rate_limit_at(start));
    }

    #[test]
    fn test_one_token_per_period() {
        let mut limiter = RateLimiter::new_with_limits(1, Duration::from_secs(2));
        let start = limiter.last_refill;
        assert!(limiter.check_rate_limit_at(start));

        assert!(!limiter.check_rate_limit_at(start + Duration::from_millis(1999)));
        assert!(limiter.check_rate_limit_at(start + Duration::from_secs(2)));
        assert!(!limiter.check_rate_limit_at(start + Duration::from_secs(3)));
        assert!(limiter.check_rate_limit_at(start + Duration::from_secs(4)));
    }

    #[test]
    fn test_refill_caps_at_burst() {
        let mut limiter = RateLimiter::new_with_limits(2, Duration::from_millis(100));
        let start = limiter.last_refill;
        assert!(limiter.check_rate_limit_at(start));
        assert!(limiter.check_rate_limit_at(start));

        let later = start + Duration::from_secs(60);
        assert!(limiter.check_rate_limit_at(later));
        assert!(limiter.check_rate_limit_at(later));
        assert!(!limiter.check_rate_limit_at(later));
    }

    #[test]
    fn test_sub_second_refill_rate() {
        let mut limiter = RateLimiter::new_with_limits(1, Duration::from_millis(250));
        let start = limiter.last_refill;
        assert!(limiter.check_rate_limit_at(start));
        assert!(limiter.check_rate_limit_at(start + Duration::from_millis(250)));
    }
}
