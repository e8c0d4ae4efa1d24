//! Forwards session change events to the navigator.

use parley_core::event::SessionChange;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

use crate::machine::Navigator;

/// Spawns a task that applies every session change to `navigator` until the
/// session is dropped.
///
/// Subscribe before resolving the session so that the resolution event is
/// not missed.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn follow_session(
    navigator: Navigator,
    mut changes: broadcast::Receiver<SessionChange>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        let advanced = navigator.on_session_change(&change);
                        debug!(kind = ?change.kind, advanced, "session change applied");
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "navigation fell behind session changes");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .instrument(info_span!("follow_session")),
    )
}
