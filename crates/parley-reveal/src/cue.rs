//! Audio Cue Limiter.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use parley_core::audio::CueSink;
use parley_core::clock::Clock;
use tracing::trace;

/// Limiter settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueConfig {
    /// Hard floor between two started cues.
    pub min_interval: Duration,
    /// Playback volume (0.0..=1.0).
    pub volume: f32,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(180),
            volume: 0.06,
        }
    }
}

/// Plays a short cue unless the previous one started less than
/// `min_interval` ago or is still audible.
pub struct AudioCueLimiter {
    sink: Arc<dyn CueSink>,
    clock: Arc<dyn Clock>,
    config: CueConfig,
    next_allowed: Mutex<Option<Instant>>,
}

impl AudioCueLimiter {
    /// Creates a limiter in front of `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn CueSink>, clock: Arc<dyn Clock>, config: CueConfig) -> Self {
        Self {
            sink,
            clock,
            config,
            next_allowed: Mutex::new(None),
        }
    }

    /// Plays the cue if allowed. Returns true if playback actually started.
    pub fn trigger(&self) -> bool {
        let now = self.clock.instant();
        let mut next_allowed = self
            .next_allowed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if next_allowed.is_some_and(|at| now < at) {
            trace!("cue suppressed, interval not elapsed");
            return false;
        }
        if self.sink.is_playing() {
            trace!("cue suppressed, still playing");
            return false;
        }

        self.sink.play(self.config.volume);
        *next_allowed = Some(now + self.config.min_interval);
        true
    }

    /// Halts playback and rewinds. Safe to call when idle.
    pub fn stop(&self) {
        self.sink.stop();
    }
}
