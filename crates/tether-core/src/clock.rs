//! Time sources.
//!
//! The core never reads the wall clock on its own; the host asks its [`Clock`]
//! and converts instants to [`Timestamp`]s relative to a fixed [`Epoch`].
//! Tests install a [`TestClock`] and advance it by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::input::Timestamp;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Clone, Debug)]
pub struct TestClock {
    t: Rc<Cell<Instant>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            t: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}

/// Origin for [`Timestamp`]s. Instants before the epoch saturate to zero.
#[derive(Clone, Copy, Debug)]
pub struct Epoch(Instant);

impl Epoch {
    pub fn new(origin: Instant) -> Self {
        Self(origin)
    }

    pub fn starting_now(clock: &dyn Clock) -> Self {
        Self(clock.now())
    }

    pub fn timestamp(&self, at: Instant) -> Timestamp {
        at.saturating_duration_since(self.0)
    }

    pub fn now(&self, clock: &dyn Clock) -> Timestamp {
        self.timestamp(clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_drives_timestamps() {
        let clock = TestClock::new();
        let epoch = Epoch::starting_now(&clock);
        assert_eq!(epoch.now(&clock), Duration::ZERO);

        let shared = clock.clone();
        shared.advance(Duration::from_millis(20));
        assert_eq!(epoch.now(&clock), Duration::from_millis(20));
    }

    #[test]
    fn instants_before_epoch_saturate() {
        let clock = TestClock::new();
        let before = clock.now();
        clock.advance(Duration::from_secs(1));
        let epoch = Epoch::starting_now(&clock);
        assert_eq!(epoch.timestamp(before), Duration::ZERO);
    }
}
