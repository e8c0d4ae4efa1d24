//! Test auth provider: returns a configured identity.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::auth::{AuthError, AuthProvider};
use parley_core::identity::Identity;

/// An auth provider that answers `current_identity` from a settable value
/// and records login/logout hand-offs.
#[derive(Debug)]
pub struct StaticAuthProvider {
    identity: Mutex<Result<Option<Identity>, AuthError>>,
    delay: Option<Duration>,
    logins: Mutex<Vec<String>>,
    logouts: Mutex<usize>,
}

impl StaticAuthProvider {
    /// A provider with no signed-in user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::with_result(Ok(None))
    }

    /// A provider that reports `identity` as signed in.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        Self::with_result(Ok(Some(identity)))
    }

    /// A provider whose lookups fail with `error`.
    #[must_use]
    pub fn failing(error: AuthError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Option<Identity>, AuthError>) -> Self {
        Self {
            identity: Mutex::new(result),
            delay: None,
            logins: Mutex::new(Vec::new()),
            logouts: Mutex::new(0),
        }
    }

    /// Delays every lookup by `delay` (virtual time under a paused runtime).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Changes what subsequent lookups return, simulating the external login
    /// round-trip completing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_identity(&self, identity: Option<Identity>) {
        *self.identity.lock().unwrap() = Ok(identity);
    }

    /// Returns the providers passed to `begin_login`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }

    /// Returns how many times `logout` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn logout_count(&self) -> usize {
        *self.logouts.lock().unwrap()
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.identity.lock().unwrap().clone()
    }

    async fn begin_login(&self, provider: &str) -> Result<(), AuthError> {
        self.logins.lock().unwrap().push(provider.to_owned());
        Ok(())
    }

    fn logout(&self) {
        *self.logouts.lock().unwrap() += 1;
    }
}
