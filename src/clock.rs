//! Time sources for parking timestamps and the eviction window.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// `Instant::now()`.
#[derive(Copy, Clone, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// test can keep one clone and hand another to the cache.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward by `by`.
    ///
    /// # Panics
    /// If the resulting time is not representable as an `Instant`.
    pub fn advance(&self, by: Duration) {
        let elapsed = self
            .elapsed
            .get()
            .checked_add(by)
            .filter(|e| self.origin.checked_add(*e).is_some());
        match elapsed {
            Some(e) => self.elapsed.set(e),
            None => panic!("ManualClock advanced past the representable range"),
        }
    }

    /// Time advanced since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        // `advance` only stores offsets that fit.
        self.origin + self.elapsed.get()
    }
}
