//! # Retry Backoff Policy
//!
//! Exponential backoff with full jitter for the UV Fetcher. The Fetcher makes
//! up to [`MAX_ATTEMPTS`] attempts per request; before every attempt after the
//! first it sleeps for a random duration drawn uniformly from
//! `[0, min(STARTING_DELAY × MULTIPLIER^(k-2), MAX_DELAY)]`, where `k` is the
//! 1-indexed number of the attempt about to be made.
//!
//! | attempt | ceiling |
//! |---------|---------|
//! | 1       | 0 s     |
//! | 2       | 5 s     |
//! | 3       | 10 s    |
//! | 4       | 20 s    |
//! | 5       | 40 s    |
//!
//! Full jitter keeps many mirrors that lost connectivity at the same moment
//! from hammering the upstream API in lock-step once it comes back.

use rand::Rng;
use std::time::Duration;

/// Total attempts per request, including the first one
pub const MAX_ATTEMPTS: u32 = 5;

/// Ceiling for the delay before the second attempt
pub const STARTING_DELAY: Duration = Duration::from_millis(5_000);

/// Growth factor applied per additional attempt
pub const MULTIPLIER: u32 = 2;

/// Upper bound on any single backoff delay (5 minutes)
pub const MAX_DELAY: Duration = Duration::from_millis(300_000);

/// Exponential backoff parameters with full jitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub starting_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            max_attempts: MAX_ATTEMPTS,
            starting_delay: STARTING_DELAY,
            multiplier: MULTIPLIER,
            max_delay: MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Largest delay allowed before `attempt` (1-indexed).
    ///
    /// The first attempt is never delayed.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use uv_index_lib::backoff::BackoffPolicy;
    ///
    /// let policy = BackoffPolicy::default();
    /// assert_eq!(policy.ceiling(1), Duration::ZERO);
    /// assert_eq!(policy.ceiling(2), Duration::from_secs(5));
    /// assert_eq!(policy.ceiling(4), Duration::from_secs(20));
    /// ```
    pub fn ceiling(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }

        let start_ms = self.starting_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let factor = (self.multiplier as u64)
            .checked_pow(attempt - 2)
            .unwrap_or(u64::MAX);

        Duration::from_millis(start_ms.saturating_mul(factor).min(max_ms))
    }

    /// Jittered delay before `attempt`, drawn from the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Jittered delay before `attempt`, uniform over `[0, ceiling(attempt)]`.
    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling_ms = self.ceiling(attempt).as_millis() as u64;
        if ceiling_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.gen_range(0..=ceiling_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ceiling_doubles_from_starting_delay() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.ceiling(2), Duration::from_secs(5));
        assert_eq!(policy.ceiling(3), Duration::from_secs(10));
        assert_eq!(policy.ceiling(4), Duration::from_secs(20));
        assert_eq!(policy.ceiling(5), Duration::from_secs(40));
    }

    #[test]
    fn test_ceiling_is_capped_at_max_delay() {
        let policy = BackoffPolicy::default();
        // 5s * 2^7 = 640s, past the 300s cap
        assert_eq!(policy.ceiling(9), MAX_DELAY);
        // Exponent large enough to overflow u64 must still clamp
        assert_eq!(policy.ceiling(200), MAX_DELAY);
    }

    #[test]
    fn test_first_attempt_is_never_delayed() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(policy.delay_with(1, &mut rng), Duration::ZERO);
        assert_eq!(policy.delay_with(0, &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_jittered_delay_stays_within_bounds() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);

        for attempt in 2..=12 {
            let bound = Duration::from_millis((5_000u64 << (attempt - 2)).min(300_000));
            for _ in 0..200 {
                let delay = policy.delay_with(attempt, &mut rng);
                assert!(
                    delay <= bound,
                    "attempt {} delay {:?} exceeds {:?}",
                    attempt,
                    delay,
                    bound
                );
            }
        }
    }

    #[test]
    fn test_jitter_actually_spreads_delays() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(1);

        let delays: Vec<Duration> = (0..50).map(|_| policy.delay_with(3, &mut rng)).collect();
        let first = delays[0];
        assert!(
            delays.iter().any(|d| *d != first),
            "full jitter should not produce a constant delay"
        );
    }
}
