//! Clock abstraction for determinism.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Abstraction over wall and monotonic time.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current monotonic instant, used for rate limiting.
    fn instant(&self) -> Instant;
}

/// Production clock that delegates to the system clock.
///
/// The monotonic reading goes through `tokio::time` so that a paused
/// runtime (tests) and timer-driven code observe the same time base.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
