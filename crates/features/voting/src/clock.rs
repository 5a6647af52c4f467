//! Time sources for the registry.
//!
//! Timestamps are Unix seconds. Both clocks here never go backwards: a later
//! call never returns less than an earlier one.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Debug + Send + Sync {
    /// Current time in Unix seconds.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Wall clock, clamped so that a system clock step backwards is never observed.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    #[must_use]
    pub const fn new() -> Self {
        Self { high_water: AtomicU64::new(0) }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Pre-epoch wall time reads as 0 and is then lifted by the high-water mark.
        let wall = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        let previous = self.high_water.fetch_max(wall, Ordering::AcqRel);
        previous.max(wall)
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: u64) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// Moves the clock forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| Some(now.saturating_add(secs)));
    }

    /// Jumps to `at`. Earlier instants are ignored.
    pub fn set(&self, at: u64) {
        self.now.fetch_max(at, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
