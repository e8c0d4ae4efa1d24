//! Parley: terminal front-end.
//!
//! Wires the session, catalog, reveal and navigation crates into one
//! application context and drives them from a line-oriented shell.

pub mod config;
pub mod context;
pub mod error;
pub mod shell;
pub mod telemetry;
pub mod terminal;
