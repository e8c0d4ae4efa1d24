//! Authentication collaborator abstraction.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::Identity;

/// Failure talking to the auth provider.
///
/// None of these are fatal: the session store resolves as anonymous.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The held credentials were rejected.
    #[error("credentials rejected")]
    Unauthorized,

    /// The requested login provider is not supported.
    #[error("unsupported login provider: {0}")]
    UnsupportedProvider(String),

    /// The provider could not be reached.
    #[error("auth transport error: {0}")]
    Transport(String),

    /// The provider answered with something unreadable.
    #[error("auth response decode error: {0}")]
    Decode(String),
}

/// External auth provider (identity lookup plus redirect-style login).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Looks up the identity for the currently held credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the lookup fails; callers treat this as
    /// "resolved, anonymous".
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError>;

    /// Starts the external login flow for `provider`.
    ///
    /// This only hands off to the provider; it never installs an identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedProvider` for unknown providers and
    /// `AuthError::Transport` if the hand-off fails.
    async fn begin_login(&self, provider: &str) -> Result<(), AuthError>;

    /// Drops any held credentials.
    fn logout(&self);
}
