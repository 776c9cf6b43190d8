// src/services/trivia/backoff.rs

use std::time::Duration;

use tokio::time::Instant;

/// Consecutive-failure counter with an exponential quiet window.
///
/// After `n` failures the upstream is left alone for `base * 2^(n-1)`,
/// capped at `cap`, measured from the latest failure.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    failures: u32,
    last_failure: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            failures: 0,
            last_failure: None,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Current quiet window; zero when there is no failure on record.
    pub fn window(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(self.failures - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Whether upstream calls should be skipped at `now`.
    pub fn is_active(&self, now: Instant) -> bool {
        match self.last_failure {
            Some(at) if self.failures > 0 => now.saturating_duration_since(at) < self.window(),
            _ => false,
        }
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.failures = self.failures.saturating_add(1);
        self.last_failure = Some(now);
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.last_failure = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(30))
    }

    #[test]
    fn window_doubles_and_caps() {
        let mut b = backoff();
        let now = Instant::now();
        assert_eq!(b.window(), Duration::ZERO);

        let expected = [1, 2, 4, 8, 16, 30, 30];
        for secs in expected {
            b.record_failure(now);
            assert_eq!(b.window(), Duration::from_secs(secs));
        }

        for _ in 0..100 {
            b.record_failure(now);
        }
        assert_eq!(b.window(), Duration::from_secs(30));
    }

    #[test]
    fn active_only_inside_the_window() {
        let mut b = backoff();
        let start = Instant::now();
        assert!(!b.is_active(start));

        b.record_failure(start);
        b.record_failure(start);
        assert!(b.is_active(start + Duration::from_millis(1999)));
        assert!(!b.is_active(start + Duration::from_secs(2)));
    }

    #[test]
    fn reset_clears_the_counter() {
        let mut b = backoff();
        let now = Instant::now();
        b.record_failure(now);
        b.reset();
        assert_eq!(b.failures(), 0);
        assert!(!b.is_active(now));
    }
}
