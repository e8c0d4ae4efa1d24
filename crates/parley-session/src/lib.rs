//! Parley client: Session State.
//!
//! Holds the current identity and the one-shot "resolving" flag, publishes a
//! change event on every mutation, and talks to the auth backend for
//! identity lookup and the redirect-style login hand-off.

pub mod http_auth;
pub mod store;

pub use http_auth::{HttpAuthConfig, HttpAuthProvider, LoginLauncher, capture_callback_token};
pub use store::Session;
