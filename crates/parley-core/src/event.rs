//! Session change events shared between the session store and its observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::Identity;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// The signed-in identity, if any.
    pub identity: Option<Identity>,
    /// True until the initial identity check has completed.
    pub resolving: bool,
}

impl SessionSnapshot {
    /// The snapshot every session starts from.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            identity: None,
            resolving: true,
        }
    }

    /// Returns true when resolution has finished and an identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.resolving && self.identity.is_some()
    }
}

/// What caused a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionChangeKind {
    /// The initial identity check completed (with or without an identity).
    Resolved,
    /// A login round-trip completed and an identity was installed.
    LoggedIn,
    /// The identity was cleared.
    LoggedOut,
}

/// Event published by the session store on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionChange {
    /// What happened.
    pub kind: SessionChangeKind,
    /// The session after the change.
    pub snapshot: SessionSnapshot,
    /// Incremented every time an identity is installed; identifies the login
    /// event an observer is reacting to.
    pub login_epoch: u64,
    /// When the change was applied.
    pub occurred_at: DateTime<Utc>,
}
