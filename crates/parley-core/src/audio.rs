//! Audio output abstraction for the reveal cue.

/// A single short sound, loaded once and replayed for every cue.
///
/// Playback is fire-and-forget, mirroring how audio devices behave: `play`
/// starts the sound from the beginning and returns immediately.
pub trait CueSink: Send + Sync {
    /// Starts playing the cue from the beginning at `volume` (0.0..=1.0).
    fn play(&self, volume: f32);

    /// Halts playback and rewinds. Safe to call when idle.
    fn stop(&self);

    /// Returns true while the sound is audibly playing.
    fn is_playing(&self) -> bool;
}
