//! Scripted Reveal Controller.
//!
//! `Pending` waits out the startup delay, `Revealing` appends one character
//! per tick, `Done` shows the call-to-action after a short grace delay.
//! Skipping jumps straight to `Done`. Teardown stops every pending timer and
//! the audio, and nothing mutates the state afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use parley_core::error::DomainError;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{Instrument, debug, info_span};

use crate::cue::AudioCueLimiter;

/// Timings of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    /// Wait before the first character appears.
    pub startup_delay: Duration,
    /// Interval between two revealed characters.
    pub tick: Duration,
    /// Wait between natural completion and the call-to-action.
    pub completion_grace: Duration,
    /// Wait between a skip and the call-to-action.
    pub skip_grace: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(1200),
            tick: Duration::from_millis(50),
            completion_grace: Duration::from_millis(500),
            skip_grace: Duration::ZERO,
        }
    }
}

impl RevealConfig {
    /// Checks that the timings can drive a reveal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the tick interval is zero.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tick.is_zero() {
            return Err(DomainError::Validation(
                "reveal tick interval must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// Waiting for the startup delay.
    Pending,
    /// Characters are being appended.
    Revealing,
    /// The full text is visible.
    Done,
}

/// How a reveal reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every tick ran.
    Completed,
    /// The user skipped ahead.
    Skipped,
}

/// Observable reveal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSnapshot {
    /// Current phase.
    pub phase: RevealPhase,
    /// Number of characters (not bytes) currently visible.
    pub revealed_chars: usize,
    /// Number of characters in the full text.
    pub total_chars: usize,
    /// Whether the call-to-action is shown.
    pub cta_visible: bool,
    /// Set once the phase is `Done`.
    pub completion: Option<Completion>,
}

impl RevealSnapshot {
    fn pending(total_chars: usize) -> Self {
        Self {
            phase: RevealPhase::Pending,
            revealed_chars: 0,
            total_chars,
            cta_visible: false,
            completion: None,
        }
    }

    /// True only during `Revealing`.
    #[must_use]
    pub fn is_revealing(&self) -> bool {
        self.phase == RevealPhase::Revealing
    }

    /// True once the reveal has finished or been skipped.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == RevealPhase::Done
    }
}

struct RevealInner {
    snapshot: RevealSnapshot,
    torn_down: bool,
    timer: Option<AbortHandle>,
}

struct Shared {
    text: Arc<str>,
    chars: Vec<char>,
    config: RevealConfig,
    cue: Arc<AudioCueLimiter>,
    inner: Mutex<RevealInner>,
    states: watch::Sender<RevealSnapshot>,
}

enum Step {
    Continue,
    Finished,
    Stopped,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RevealInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &RevealInner) {
        self.states.send_replace(inner.snapshot.clone());
    }

    /// Pending -> Revealing. Returns false if the reveal was skipped or torn
    /// down in the meantime.
    fn begin(&self) -> bool {
        let mut inner = self.lock();
        if inner.torn_down || inner.snapshot.phase != RevealPhase::Pending {
            return false;
        }
        inner.snapshot.phase = RevealPhase::Revealing;
        self.publish(&inner);
        debug!(total_chars = inner.snapshot.total_chars, "reveal started");
        true
    }

    fn advance(&self) -> Step {
        let mut inner = self.lock();
        if inner.torn_down || inner.snapshot.phase != RevealPhase::Revealing {
            return Step::Stopped;
        }

        if let Some(&next) = self.chars.get(inner.snapshot.revealed_chars) {
            inner.snapshot.revealed_chars += 1;
            if !next.is_whitespace() {
                self.cue.trigger();
            }
        }

        if inner.snapshot.revealed_chars >= inner.snapshot.total_chars {
            inner.snapshot.phase = RevealPhase::Done;
            inner.snapshot.completion = Some(Completion::Completed);
            self.publish(&inner);
            self.cue.stop();
            debug!("reveal completed");
            return Step::Finished;
        }

        self.publish(&inner);
        Step::Continue
    }

    fn show_cta(&self) {
        let mut inner = self.lock();
        if inner.torn_down || inner.snapshot.cta_visible {
            return;
        }
        inner.snapshot.cta_visible = true;
        inner.timer = None;
        self.publish(&inner);
    }
}

async fn run(shared: Arc<Shared>) {
    time::sleep(shared.config.startup_delay).await;
    if !shared.begin() {
        return;
    }

    let tick = shared.config.tick;
    let mut ticker = time::interval_at(time::Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match shared.advance() {
            Step::Continue => {}
            Step::Finished => break,
            Step::Stopped => return,
        }
    }

    time::sleep(shared.config.completion_grace).await;
    shared.show_cta();
}

/// Owns a running reveal.
///
/// Dropping the handle tears the reveal down, the same as
/// [`RevealHandle::cancel`].
pub struct RevealHandle {
    shared: Arc<Shared>,
}

impl RevealHandle {
    /// Starts revealing `text` on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `config` is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(
        text: impl Into<Arc<str>>,
        config: RevealConfig,
        cue: Arc<AudioCueLimiter>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let text: Arc<str> = text.into();
        let chars: Vec<char> = text.chars().collect();
        let snapshot = RevealSnapshot::pending(chars.len());
        let (states, _) = watch::channel(snapshot.clone());

        let shared = Arc::new(Shared {
            text,
            chars,
            config,
            cue,
            inner: Mutex::new(RevealInner {
                snapshot,
                torn_down: false,
                timer: None,
            }),
            states,
        });

        let task = tokio::spawn(run(shared.clone()).instrument(info_span!("reveal")));
        shared.lock().timer = Some(task.abort_handle());
        Ok(Self { shared })
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> RevealSnapshot {
        self.shared.lock().snapshot.clone()
    }

    /// Returns a receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<RevealSnapshot> {
        self.shared.states.subscribe()
    }

    /// The full text being revealed.
    pub fn text(&self) -> &str {
        &self.shared.text
    }

    /// The currently visible prefix of the text.
    pub fn revealed_text(&self) -> String {
        let revealed = self.shared.lock().snapshot.revealed_chars;
        self.shared.chars[..revealed].iter().collect()
    }

    /// Jumps to the full text and stops the audio.
    ///
    /// The call-to-action appears after the skip grace delay. Returns false
    /// if the reveal was already done or torn down.
    pub fn skip(&self) -> bool {
        let mut inner = self.shared.lock();
        if inner.torn_down || inner.snapshot.phase == RevealPhase::Done {
            return false;
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.snapshot.phase = RevealPhase::Done;
        inner.snapshot.revealed_chars = inner.snapshot.total_chars;
        inner.snapshot.completion = Some(Completion::Skipped);
        self.shared.cue.stop();
        debug!("reveal skipped");

        let grace = self.shared.config.skip_grace;
        if grace.is_zero() {
            inner.snapshot.cta_visible = true;
        } else {
            let shared = self.shared.clone();
            let task = tokio::spawn(async move {
                time::sleep(grace).await;
                shared.show_cta();
            });
            inner.timer = Some(task.abort_handle());
        }
        self.shared.publish(&inner);
        true
    }

    /// Tears the reveal down: every pending timer is cancelled and the audio
    /// is stopped. Idempotent.
    pub fn cancel(&self) {
        let mut inner = self.shared.lock();
        if inner.torn_down {
            return;
        }
        inner.torn_down = true;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        drop(inner);
        self.shared.cue.stop();
        debug!("reveal torn down");
    }

    /// True once [`RevealHandle::cancel`] has run.
    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().torn_down
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parley_core::clock::SystemClock;
    use parley_test_support::{CueEvent, RecordingCueSink};

    use super::*;
    use crate::cue::{AudioCueLimiter, CueConfig};

    fn cue() -> (Arc<AudioCueLimiter>, Arc<RecordingCueSink>) {
        let sink = Arc::new(RecordingCueSink::new());
        let limiter = AudioCueLimiter::new(sink.clone(), Arc::new(SystemClock), CueConfig::default());
        (Arc::new(limiter), sink)
    }

    async fn settle(by: Duration) {
        time::sleep(by).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_stays_pending_during_startup_delay() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("Hello", RevealConfig::default(), cue).unwrap();

        // Act
        settle(Duration::from_millis(1100)).await;

        // Assert
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, RevealPhase::Pending);
        assert_eq!(snapshot.revealed_chars, 0);
        assert!(!snapshot.is_revealing());
        assert_eq!(sink.play_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_appends_one_character_per_tick() {
        // Arrange
        let (cue, _sink) = cue();
        let handle = RevealHandle::start("Hello", RevealConfig::default(), cue).unwrap();

        // Act
        settle(Duration::from_millis(1200 + 3 * 50 + 10)).await;

        // Assert
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, RevealPhase::Revealing);
        assert!(snapshot.is_revealing());
        assert_eq!(snapshot.revealed_chars, 3);
        assert_eq!(handle.revealed_text(), "Hel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_natural_completion_shows_cta_after_grace() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("Hi there", RevealConfig::default(), cue).unwrap();
        let reveal_end = Duration::from_millis(1200 + 8 * 50);

        // Act
        settle(reveal_end + Duration::from_millis(10)).await;
        let at_completion = handle.snapshot();
        settle(Duration::from_millis(500)).await;
        let after_grace = handle.snapshot();

        // Assert
        assert_eq!(at_completion.phase, RevealPhase::Done);
        assert_eq!(at_completion.completion, Some(Completion::Completed));
        assert_eq!(at_completion.revealed_chars, 8);
        assert!(!at_completion.is_revealing());
        assert!(!at_completion.cta_visible);
        assert!(after_grace.cta_visible);
        assert_eq!(handle.revealed_text(), "Hi there");
        assert_eq!(sink.events().last(), Some(&CueEvent::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_ticks_never_trigger_the_cue() {
        // Arrange
        let (cue, sink) = cue();
        let config = RevealConfig {
            tick: Duration::from_millis(200),
            ..RevealConfig::default()
        };
        let _handle = RevealHandle::start("a \nb", config, cue).unwrap();

        // Act
        settle(Duration::from_millis(1200 + 4 * 200 + 10)).await;

        // Assert
        assert_eq!(sink.play_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cue_is_rate_limited_across_ticks() {
        // Arrange
        let (cue, sink) = cue();
        let _handle = RevealHandle::start("abcdefgh", RevealConfig::default(), cue).unwrap();

        // Act: eight ticks 50 ms apart span 350 ms between first and last.
        settle(Duration::from_millis(1200 + 8 * 50 + 10)).await;

        // Assert
        let plays = sink
            .events()
            .iter()
            .filter(|event| matches!(event, CueEvent::Play(_)))
            .count();
        assert_eq!(plays, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_during_pending_reveals_everything_with_cta() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("Welcome", RevealConfig::default(), cue).unwrap();
        settle(Duration::from_millis(300)).await;

        // Act
        let skipped = handle.skip();

        // Assert
        let snapshot = handle.snapshot();
        assert!(skipped);
        assert_eq!(snapshot.phase, RevealPhase::Done);
        assert_eq!(snapshot.completion, Some(Completion::Skipped));
        assert_eq!(snapshot.revealed_chars, snapshot.total_chars);
        assert!(snapshot.cta_visible);
        assert_eq!(sink.events(), vec![CueEvent::Stop]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_during_revealing_stops_further_ticks_and_audio() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("abcdefghij", RevealConfig::default(), cue).unwrap();
        settle(Duration::from_millis(1200 + 2 * 50 + 10)).await;
        let plays_before = sink.play_count();

        // Act
        handle.skip();
        settle(Duration::from_secs(2)).await;

        // Assert
        assert_eq!(handle.revealed_text(), "abcdefghij");
        assert_eq!(sink.play_count(), plays_before);
        assert_eq!(sink.events().last(), Some(&CueEvent::Stop));
        assert!(handle.snapshot().cta_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_grace_delays_cta() {
        // Arrange
        let (cue, _sink) = cue();
        let config = RevealConfig {
            skip_grace: Duration::from_millis(300),
            ..RevealConfig::default()
        };
        let handle = RevealHandle::start("Welcome", config, cue).unwrap();

        // Act
        handle.skip();
        let immediately = handle.snapshot().cta_visible;
        settle(Duration::from_millis(310)).await;

        // Assert
        assert!(!immediately);
        assert!(handle.snapshot().cta_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_when_done_is_a_no_op() {
        // Arrange
        let (cue, _sink) = cue();
        let handle = RevealHandle::start("ab", RevealConfig::default(), cue).unwrap();
        settle(Duration::from_secs(3)).await;

        // Act
        let skipped = handle.skip();

        // Assert
        assert!(!skipped);
        assert_eq!(handle.snapshot().completion, Some(Completion::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_state_and_stops_audio() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("abcdefghij", RevealConfig::default(), cue).unwrap();
        settle(Duration::from_millis(1200 + 3 * 50 + 10)).await;
        let frozen = handle.snapshot();
        let plays_before = sink.play_count();

        // Act
        handle.cancel();
        handle.cancel();
        settle(Duration::from_secs(5)).await;

        // Assert
        assert!(handle.is_cancelled());
        assert_eq!(handle.snapshot(), frozen);
        assert!(!handle.snapshot().cta_visible);
        assert_eq!(sink.play_count(), plays_before);
        assert_eq!(sink.events().last(), Some(&CueEvent::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_completion_grace_never_shows_cta() {
        // Arrange
        let (cue, _sink) = cue();
        let handle = RevealHandle::start("ab", RevealConfig::default(), cue).unwrap();
        settle(Duration::from_millis(1200 + 2 * 50 + 10)).await;
        assert!(handle.snapshot().is_done());

        // Act
        handle.cancel();
        settle(Duration::from_secs(1)).await;

        // Assert
        assert!(!handle.snapshot().cta_visible);
        assert!(!handle.skip());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_completes_on_first_tick() {
        // Arrange
        let (cue, sink) = cue();
        let handle = RevealHandle::start("", RevealConfig::default(), cue).unwrap();

        // Act
        settle(Duration::from_millis(1200 + 50 + 500 + 10)).await;

        // Assert
        let snapshot = handle.snapshot();
        assert!(snapshot.is_done());
        assert!(snapshot.cta_visible);
        assert_eq!(sink.play_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multibyte_text_is_revealed_by_character() {
        // Arrange
        let (cue, _sink) = cue();
        let handle = RevealHandle::start("Şöz", RevealConfig::default(), cue).unwrap();

        // Act
        settle(Duration::from_millis(1200 + 2 * 50 + 10)).await;

        // Assert
        assert_eq!(handle.revealed_text(), "Şö");
        assert_eq!(handle.snapshot().total_chars, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_receives_cta_visibility() {
        // Arrange
        let (cue, _sink) = cue();
        let handle = RevealHandle::start("ok", RevealConfig::default(), cue).unwrap();
        let mut states = handle.watch();

        // Act
        let snapshot = states
            .wait_for(|snapshot| snapshot.cta_visible)
            .await
            .unwrap()
            .clone();

        // Assert
        assert_eq!(snapshot.revealed_chars, 2);
        assert_eq!(snapshot.completion, Some(Completion::Completed));
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        // Arrange
        let config = RevealConfig {
            tick: Duration::ZERO,
            ..RevealConfig::default()
        };

        // Act
        let result = config.validate();

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
