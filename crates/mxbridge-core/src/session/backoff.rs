//! Exponential back-off for the sync loop.

use std::time::Duration;

/// Delay before the first retry after a failed sync.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Doubling back-off, capped at `max` and reset after a success.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait before the next attempt; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}
