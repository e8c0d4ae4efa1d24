//! Shared test doubles and utilities for the Parley client.

mod audio;
mod auth;
mod clock;
mod transport;

pub use audio::{CueEvent, RecordingCueSink};
pub use auth::StaticAuthProvider;
pub use clock::{ManualClock, fixed_now};
pub use transport::ScriptedCatalogTransport;
