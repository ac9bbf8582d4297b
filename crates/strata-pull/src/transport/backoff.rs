//! Exponential backoff with jitter between transport retries.

use std::time::Duration;

use crate::options::RetryConfig;

/// Delay calculator: `min(base * 2^attempt, max)` plus up to a quarter of
/// that again as random jitter.
#[derive(Debug)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            attempt: 0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.base_delay_ms, config.max_delay_ms)
    }

    /// Next delay; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base_ms.saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_ms);
        let jitter = rand::random::<u64>() % (capped / 4 + 1);
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(capped + jitter)
    }

    /// Number of delays handed out since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow() {
        let mut backoff = Backoff::new(100, 10_000);
        assert!(backoff.next_delay().as_millis() >= 100);
        assert!(backoff.next_delay().as_millis() >= 200);
        assert!(backoff.next_delay().as_millis() >= 400);
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn delays_are_capped() {
        let mut backoff = Backoff::new(100, 500);
        for _ in 0..70 {
            assert!(backoff.next_delay().as_millis() <= 625);
        }
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::from_config(&RetryConfig::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert!(backoff.next_delay().as_millis() < 200);
    }
}
