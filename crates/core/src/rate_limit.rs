//! Minimum-interval throttling.

use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Drops events that arrive sooner than `interval` after the last accepted
/// one.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    interval: Duration,
    last: Option<Instant>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(interval: Duration, clock: C) -> Self {
        Self {
            clock,
            interval,
            last: None,
        }
    }

    /// Returns `true` if the caller should skip this event. An accepted event
    /// restarts the interval.
    pub fn is_limited(&mut self) -> bool {
        let now = self.clock.now();
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => true,
            _ => {
                self.last = Some(now);
                false
            }
        }
    }

    /// Accept the next event unconditionally.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
