//! Monotonic time source

use std::time::{Duration, Instant};

/// Supplies timestamps for input events and deadline checks
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-independent monotonic clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Whole milliseconds between two instants, saturating at zero
pub fn millis_between(earlier: Instant, later: Instant) -> u64 {
    let elapsed: Duration = later.saturating_duration_since(earlier);
    elapsed.as_millis().min(u64::MAX as u128) as u64
}
