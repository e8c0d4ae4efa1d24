//! Test cue sink: records every play/stop call.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use parley_core::audio::CueSink;

/// A call observed by [`RecordingCueSink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueEvent {
    /// `play` was called with this volume.
    Play(f32),
    /// `stop` was called.
    Stop,
}

/// A cue sink that records calls. The sound is considered playing from a
/// `play` until the next `stop`, unless `set_sticky_playing(false)` makes
/// every play finish instantly.
#[derive(Debug)]
pub struct RecordingCueSink {
    events: Mutex<Vec<CueEvent>>,
    playing: AtomicBool,
    sticky: AtomicBool,
}

impl RecordingCueSink {
    /// Creates a sink whose plays finish instantly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            playing: AtomicBool::new(false),
            sticky: AtomicBool::new(false),
        }
    }

    /// When `true`, a started cue keeps playing until `stop` is called.
    pub fn set_sticky_playing(&self, sticky: bool) {
        self.sticky.store(sticky, Ordering::SeqCst);
    }

    /// Forces the playing flag, simulating a sound that is still audible.
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Returns a snapshot of all recorded calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<CueEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns how many times `play` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn play_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, CueEvent::Play(_)))
            .count()
    }

    /// Returns how many times `stop` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stop_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, CueEvent::Stop))
            .count()
    }
}

impl Default for RecordingCueSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CueSink for RecordingCueSink {
    fn play(&self, volume: f32) {
        self.events.lock().unwrap().push(CueEvent::Play(volume));
        if self.sticky.load(Ordering::SeqCst) {
            self.playing.store(true, Ordering::SeqCst);
        }
    }

    fn stop(&self) {
        self.events.lock().unwrap().push(CueEvent::Stop);
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
