//! Where "now" comes from when a task records its execution time.

use std::cell::Cell;
use std::time::{Duration, SystemTime};

pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// The process clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
/// Every reading advances it by one tick, so two tasks executed back to back
/// never share a timestamp, however coarse the surrounding filesystem is.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<SystemTime>,
    tick: Duration,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        ManualClock {
            now: Cell::new(start),
            tick: Duration::from_micros(1),
        }
    }

    /// The time the next reading will return, without consuming a tick.
    pub fn peek(&self) -> SystemTime {
        self.now.get()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: SystemTime) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        let now = self.now.get();
        self.now.set(now + self.tick);
        now
    }
}
