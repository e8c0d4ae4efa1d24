//! Test clock: deterministic `Clock` implementation for tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use parley_core::clock::Clock;

/// Fixed wall-clock timestamp used across tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(DateTime<Utc>, Instant)>,
}

impl ManualClock {
    /// Creates a clock frozen at [`fixed_now`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new((fixed_now(), Instant::now())),
        }
    }

    /// Moves both wall and monotonic time forward by `by`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 += chrono::Duration::from_std(by).unwrap();
        state.1 += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().0
    }

    fn instant(&self) -> Instant {
        self.state.lock().unwrap().1
    }
}
