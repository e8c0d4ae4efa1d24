//! Parley client: Scripted Reveal Controller and Audio Cue Limiter.
//!
//! The intro text is revealed one character per tick after a startup
//! delay. Non-whitespace ticks fire a short audio cue through a limiter that
//! never lets the cue overlap itself. The reveal runs as a background task
//! owned by a [`RevealHandle`]; cancelling (or dropping) the handle stops
//! every timer and the audio.

pub mod controller;
pub mod cue;
pub mod script;

pub use controller::{Completion, RevealConfig, RevealHandle, RevealPhase, RevealSnapshot};
pub use cue::{AudioCueLimiter, CueConfig};
pub use script::WELCOME_TEXT;
