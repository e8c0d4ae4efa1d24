//! Process-wide session store.
//!
//! A single `Session` lives for the whole application. It is the only
//! writer of the identity and the resolving flag; observers either read a
//! snapshot, follow the `watch` channel, or subscribe to discrete
//! [`SessionChange`] events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::auth::{AuthError, AuthProvider};
use parley_core::clock::Clock;
use parley_core::event::{SessionChange, SessionChangeKind, SessionSnapshot};
use parley_core::identity::Identity;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

/// Capacity of the change event channel. Observers that lag further behind
/// than this lose the oldest events.
const CHANGE_BUFFER: usize = 16;

#[derive(Debug)]
struct SessionState {
    snapshot: SessionSnapshot,
    login_epoch: u64,
    logouts: u64,
}

/// Authentication state for the application lifetime.
pub struct Session {
    provider: Arc<dyn AuthProvider>,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
    changes: broadcast::Sender<SessionChange>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// Creates a session in the initial `resolving` state.
    #[must_use]
    pub fn new(provider: Arc<dyn AuthProvider>, clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let (snapshots, _) = watch::channel(SessionSnapshot::initial());
        Self {
            provider,
            clock,
            state: Mutex::new(SessionState {
                snapshot: SessionSnapshot::initial(),
                login_epoch: 0,
                logouts: 0,
            }),
            changes,
            snapshots,
        }
    }

    /// Returns the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot.clone()
    }

    /// Returns true until the initial identity check has completed.
    pub fn resolving(&self) -> bool {
        self.lock().snapshot.resolving
    }

    /// Returns the signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.lock().snapshot.identity.clone()
    }

    /// Subscribes to change events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    /// Returns a receiver that always holds the latest snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Runs the initial identity check and clears the resolving flag.
    ///
    /// Failures resolve the session as anonymous. Only the first completed
    /// call has any effect; later calls return the current snapshot.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> SessionSnapshot {
        let logouts_before = {
            let state = self.lock();
            if !state.snapshot.resolving {
                return state.snapshot.clone();
            }
            state.logouts
        };

        let identity = match self.provider.current_identity().await {
            Ok(identity) => identity,
            Err(error) => {
                warn!(%error, "identity check failed, continuing anonymously");
                None
            }
        };

        let mut state = self.lock();
        if !state.snapshot.resolving {
            return state.snapshot.clone();
        }
        // A logout issued while the check was in flight wins.
        let identity = identity.filter(|_| state.logouts == logouts_before);
        if identity.is_some() {
            state.login_epoch += 1;
        }
        state.snapshot = SessionSnapshot {
            identity,
            resolving: false,
        };
        info!(
            authenticated = state.snapshot.identity.is_some(),
            "session resolved"
        );
        self.publish(&state, SessionChangeKind::Resolved);
        state.snapshot.clone()
    }

    /// Hands a login intent to the auth provider.
    ///
    /// The session is not mutated here; it changes only when the external
    /// round-trip completes and [`Session::rehydrate`] runs.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider rejects the hand-off.
    #[instrument(skip(self))]
    pub async fn login(&self, provider: &str) -> Result<(), AuthError> {
        info!(provider, "starting login hand-off");
        self.provider.begin_login(provider).await
    }

    /// Re-queries the auth provider after a login round-trip and installs
    /// the result wholesale.
    ///
    /// An unchanged identity publishes nothing. If the session was still
    /// resolving, this counts as the resolution.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> SessionSnapshot {
        let logouts_before = self.lock().logouts;
        let result = self.provider.current_identity().await;

        let mut state = self.lock();
        let identity = match result {
            Ok(identity) => identity,
            Err(error) if state.snapshot.resolving => {
                warn!(%error, "identity check failed, continuing anonymously");
                None
            }
            Err(error) => {
                warn!(%error, "identity re-check failed, keeping current session");
                return state.snapshot.clone();
            }
        };
        let identity = identity.filter(|_| state.logouts == logouts_before);

        let kind = if state.snapshot.resolving {
            SessionChangeKind::Resolved
        } else {
            match (&identity, &state.snapshot.identity) {
                (Some(new), Some(old)) if new == old => {
                    debug!("identity unchanged after rehydrate");
                    return state.snapshot.clone();
                }
                (Some(_), _) => SessionChangeKind::LoggedIn,
                (None, Some(_)) => SessionChangeKind::LoggedOut,
                (None, None) => return state.snapshot.clone(),
            }
        };

        if identity.is_some() {
            state.login_epoch += 1;
        }
        state.snapshot = SessionSnapshot {
            identity,
            resolving: false,
        };
        info!(?kind, login_epoch = state.login_epoch, "session rehydrated");
        self.publish(&state, kind);
        state.snapshot.clone()
    }

    /// Clears the identity synchronously. Idempotent: a second call leaves
    /// the same cleared state and publishes nothing.
    pub fn logout(&self) -> SessionSnapshot {
        self.provider.logout();

        let mut state = self.lock();
        state.logouts += 1;
        if state.snapshot.identity.is_none() {
            return state.snapshot.clone();
        }
        state.snapshot.identity = None;
        info!("logged out");
        self.publish(&state, SessionChangeKind::LoggedOut);
        state.snapshot.clone()
    }

    fn publish(&self, state: &SessionState, kind: SessionChangeKind) {
        self.snapshots.send_replace(state.snapshot.clone());
        let change = SessionChange {
            kind,
            snapshot: state.snapshot.clone(),
            login_epoch: state.login_epoch,
            occurred_at: self.clock.now(),
        };
        if self.changes.send(change).is_err() {
            debug!(?kind, "no session subscribers");
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
