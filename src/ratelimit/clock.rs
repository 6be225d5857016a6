//! Time sources for token buckets.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// Buckets read the clock once per decision. Tests substitute a
/// [`ManualClock`] to advance time deterministically.
pub trait Clock: Send + Sync {
    /// Current reading of the clock.
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can hand one clone to a bucket
/// and keep another to drive time forward (or backward).
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    reading: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            reading: Arc::new(Mutex::new(origin)),
        }
    }

    /// Move the clock forward, stopping near the largest representable
    /// instant.
    pub fn advance(&self, by: Duration) {
        let mut reading = self.reading.lock();
        let mut step = by;
        while !step.is_zero() {
            match reading.checked_add(step) {
                Some(next) => *reading = next,
                None => step /= 2,
            }
        }
    }

    /// Move the clock backward, stopping at its origin.
    ///
    /// Real monotonic clocks never do this, but some platform clocks have been
    /// known to, and buckets must tolerate it.
    pub fn rewind(&self, by: Duration) {
        let mut reading = self.reading.lock();
        *reading = reading
            .checked_sub(by)
            .filter(|earlier| *earlier >= self.origin)
            .unwrap_or(self.origin);
    }

    /// Time the clock has been advanced past its origin.
    pub fn elapsed(&self) -> Duration {
        *self.reading.lock() - self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.reading.lock()
    }
}
