//! Parley Core: shared domain types and collaborator traits.
//!
//! This crate defines the values that flow between the session, catalog,
//! reveal and navigation crates, together with the traits behind which the
//! external collaborators (auth provider, catalog backend, audio output)
//! are hidden. It contains no HTTP or terminal code.

pub mod audio;
pub mod auth;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod event;
pub mod identity;
pub mod scenario;
pub mod transport;
