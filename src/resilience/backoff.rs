//! Jittered exponential backoff between retry attempts.

use std::time::Duration;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Un-jittered wait after `attempts_made` failed attempts:
    /// `base * 2^(attempts_made - 1)`, capped at `max`.
    pub fn ceiling(&self, attempts_made: u32) -> Duration {
        if attempts_made == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempts_made - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// The ceiling plus up to 10% random jitter.
    pub fn delay(&self, attempts_made: u32) -> Duration {
        let ceiling = self.ceiling(attempts_made);
        let jitter_range = u64::try_from(ceiling.as_millis() / 10).unwrap_or(u64::MAX);
        if jitter_range == 0 {
            return ceiling;
        }
        ceiling + Duration::from_millis(fastrand::u64(0..jitter_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_ms: u64, max_ms: u64) -> Backoff {
        Backoff::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    #[test]
    fn test_doubles_until_capped() {
        let b = backoff(100, 1000);
        assert_eq!(b.ceiling(1), Duration::from_millis(100));
        assert_eq!(b.ceiling(2), Duration::from_millis(200));
        assert_eq!(b.ceiling(4), Duration::from_millis(800));
        assert_eq!(b.ceiling(5), Duration::from_millis(1000));
        assert_eq!(b.ceiling(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let b = backoff(100, 2000);
        for _ in 0..100 {
            let d = b.delay(1).as_millis();
            assert!((100..110).contains(&d), "{d}");
        }
    }

    #[test]
    fn test_zero_delays() {
        assert_eq!(backoff(100, 1000).delay(0), Duration::ZERO);
        assert_eq!(backoff(0, 1000).delay(3), Duration::ZERO);
    }
}
