//! Catalog Loader: primary/fallback fetch with a generation guard.
//!
//! Every load belongs to a generation. Only the attempt belonging to the
//! current in-flight generation may commit to the shared state, so a
//! cancelled or superseded attempt can never overwrite a newer result.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_core::clock::Clock;
use parley_core::error::DomainError;
use parley_core::scenario::Scenario;
use parley_core::transport::{AttemptError, CatalogRoute, CatalogTransport};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::state::{CatalogFetchState, CatalogStatus};

/// Message surfaced when no path could produce the catalog.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Scenarios could not be loaded.";

/// Which primary failures are retried through the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Only 401/403 on the primary path trigger the fallback.
    AuthOnly,
    /// Authorization and network-level failures trigger the fallback.
    #[default]
    AuthOrNetwork,
    /// Every primary failure triggers the fallback.
    AnyFailure,
}

impl FallbackPolicy {
    /// Returns true if `primary_error` should be retried via the fallback.
    #[must_use]
    pub fn allows(self, primary_error: &AttemptError) -> bool {
        match self {
            Self::AuthOnly => primary_error.is_authorization(),
            Self::AuthOrNetwork => primary_error.is_authorization() || primary_error.is_network(),
            Self::AnyFailure => true,
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "auth-only" => Ok(Self::AuthOnly),
            "auth-or-network" => Ok(Self::AuthOrNetwork),
            "any-failure" => Ok(Self::AnyFailure),
            other => Err(DomainError::Validation(format!(
                "unknown fallback policy `{other}` (expected auth-only, auth-or-network or any-failure)"
            ))),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthOnly => f.write_str("auth-only"),
            Self::AuthOrNetwork => f.write_str("auth-or-network"),
            Self::AnyFailure => f.write_str("any-failure"),
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// When to try the fallback path.
    pub fallback_policy: FallbackPolicy,
    /// The single message shown to the user on total failure.
    pub failure_message: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fallback_policy: FallbackPolicy::default(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_owned(),
        }
    }
}

/// Why a load did not produce a catalog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// `try_load` was called while another load was in flight.
    #[error("a catalog load is already in flight")]
    AlreadyLoading,

    /// No path produced the catalog. `message` is what the user sees; both
    /// underlying causes are kept for diagnostics.
    #[error("{message}")]
    Unavailable {
        /// User-facing message.
        message: String,
        /// Why the primary attempt failed.
        primary: AttemptError,
        /// Why the fallback attempt failed, if it ran.
        fallback: Option<AttemptError>,
    },

    /// The load was cancelled before it completed.
    #[error("catalog load was cancelled")]
    Cancelled,
}

/// Result shared by every caller of one load generation.
pub type LoadOutcome = Result<Arc<[Scenario]>, FetchError>;

type OutcomeSender = Arc<watch::Sender<Option<LoadOutcome>>>;

struct InFlight {
    generation: u64,
    outcome: OutcomeSender,
    task: AbortHandle,
    /// State to restore if this generation is cancelled.
    previous: CatalogFetchState,
}

struct LoaderInner {
    state: CatalogFetchState,
    generation: u64,
    in_flight: Option<InFlight>,
}

struct Shared {
    transport: Arc<dyn CatalogTransport>,
    clock: Arc<dyn Clock>,
    config: CatalogConfig,
    inner: Mutex<LoaderInner>,
    states: watch::Sender<CatalogFetchState>,
}

/// Process-wide scenario catalog loader.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct CatalogLoader {
    shared: Arc<Shared>,
}

impl CatalogLoader {
    /// Creates an idle loader.
    #[must_use]
    pub fn new(
        transport: Arc<dyn CatalogTransport>,
        clock: Arc<dyn Clock>,
        config: CatalogConfig,
    ) -> Self {
        let (states, _) = watch::channel(CatalogFetchState::default());
        Self {
            shared: Arc::new(Shared {
                transport,
                clock,
                config,
                inner: Mutex::new(LoaderInner {
                    state: CatalogFetchState::default(),
                    generation: 0,
                    in_flight: None,
                }),
                states,
            }),
        }
    }

    /// Returns the current fetch state.
    pub fn state(&self) -> CatalogFetchState {
        self.shared.lock().state.clone()
    }

    /// Returns a receiver that always holds the latest fetch state.
    pub fn watch(&self) -> watch::Receiver<CatalogFetchState> {
        self.shared.states.subscribe()
    }

    /// Returns true while a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.lock().in_flight.is_some()
    }

    /// Loads the catalog, joining the in-flight load if there is one.
    ///
    /// Overlapping callers share one primary (and, if needed, one fallback)
    /// round-trip and observe the same outcome. An empty catalog is a
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Unavailable` when every permitted path failed
    /// and `FetchError::Cancelled` if the load was cancelled.
    pub async fn load(&self) -> LoadOutcome {
        let outcome = {
            let mut inner = self.shared.lock();
            let joined = inner.in_flight.as_ref().map(|in_flight| {
                debug!(generation = in_flight.generation, "joining in-flight catalog load");
                in_flight.outcome.subscribe()
            });
            match joined {
                Some(receiver) => receiver,
                None => self.start(&mut inner),
            }
        };
        wait_for_outcome(outcome).await
    }

    /// Loads the catalog, refusing to join an in-flight load.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::AlreadyLoading` if a load is in flight, otherwise
    /// the same errors as [`CatalogLoader::load`].
    pub async fn try_load(&self) -> LoadOutcome {
        let outcome = {
            let mut inner = self.shared.lock();
            if inner.in_flight.is_some() {
                return Err(FetchError::AlreadyLoading);
            }
            self.start(&mut inner)
        };
        wait_for_outcome(outcome).await
    }

    /// Cancels the in-flight load, if any.
    ///
    /// The request is aborted, waiters receive `FetchError::Cancelled`, and
    /// the state returns to what it was before the load started. Returns
    /// true if a load was cancelled.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.lock();
        let Some(in_flight) = inner.in_flight.take() else {
            return false;
        };
        in_flight.task.abort();
        inner.generation += 1;
        inner.state = in_flight.previous;
        self.shared.states.send_replace(inner.state.clone());
        in_flight
            .outcome
            .send_replace(Some(Err(FetchError::Cancelled)));
        info!(generation = in_flight.generation, "catalog load cancelled");
        true
    }

    fn start(&self, inner: &mut LoaderInner) -> watch::Receiver<Option<LoadOutcome>> {
        inner.generation += 1;
        let generation = inner.generation;
        let correlation_id = Uuid::new_v4();

        let previous = inner.state.clone();
        inner.state = CatalogFetchState {
            status: CatalogStatus::Loading,
            error_message: None,
            ..previous.clone()
        };
        self.shared.states.send_replace(inner.state.clone());

        let (sender, receiver) = watch::channel(None);
        let outcome = Arc::new(sender);
        let shared = Arc::clone(&self.shared);
        let span = info_span!("catalog_load", generation, %correlation_id);
        let task = tokio::spawn(
            async move {
                let result = shared.attempt().await;
                shared.commit(generation, result);
            }
            .instrument(span),
        );

        info!(generation, %correlation_id, "catalog load started");
        inner.in_flight = Some(InFlight {
            generation,
            outcome,
            task: task.abort_handle(),
            previous,
        });
        receiver
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LoaderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Primary, then (strictly after the primary's outcome is known and only
    /// if the policy allows) the fallback.
    async fn attempt(&self) -> Result<Vec<Scenario>, FetchError> {
        let primary = match self.transport.fetch(CatalogRoute::Primary).await {
            Ok(items) => {
                debug!(count = items.len(), "primary catalog request succeeded");
                return Ok(items);
            }
            Err(primary) => primary,
        };

        if !self.config.fallback_policy.allows(&primary) {
            error!(%primary, policy = %self.config.fallback_policy, "primary catalog request failed, fallback not permitted");
            return Err(FetchError::Unavailable {
                message: self.config.failure_message.clone(),
                primary,
                fallback: None,
            });
        }

        warn!(%primary, "primary catalog request failed, trying public fallback");
        match self.transport.fetch(CatalogRoute::Fallback).await {
            Ok(items) => {
                debug!(count = items.len(), "fallback catalog request succeeded");
                Ok(items)
            }
            Err(fallback) => {
                error!(%primary, %fallback, "catalog unavailable on both paths");
                Err(FetchError::Unavailable {
                    message: self.config.failure_message.clone(),
                    primary,
                    fallback: Some(fallback),
                })
            }
        }
    }

    fn commit(&self, generation: u64, result: Result<Vec<Scenario>, FetchError>) {
        let mut inner = self.lock();
        let current = inner
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation);
        if !current || inner.generation != generation {
            debug!(generation, "discarding superseded catalog result");
            return;
        }
        let Some(in_flight) = inner.in_flight.take() else {
            return;
        };

        let outcome: LoadOutcome = match result {
            Ok(items) => {
                let items: Arc<[Scenario]> = Arc::from(items);
                inner.state = CatalogFetchState {
                    status: CatalogStatus::Ready,
                    items: Arc::clone(&items),
                    error_message: None,
                    loaded_at: Some(self.clock.now()),
                };
                info!(generation, count = items.len(), "catalog ready");
                Ok(items)
            }
            Err(error) => {
                inner.state = CatalogFetchState {
                    status: CatalogStatus::Failed,
                    items: Arc::from(Vec::new()),
                    error_message: Some(error.to_string()),
                    loaded_at: inner.state.loaded_at,
                };
                Err(error)
            }
        };

        self.states.send_replace(inner.state.clone());
        in_flight.outcome.send_replace(Some(outcome));
    }
}

async fn wait_for_outcome(mut outcome: watch::Receiver<Option<LoadOutcome>>) -> LoadOutcome {
    match outcome.wait_for(Option::is_some).await {
        Ok(resolved) => resolved.clone().unwrap_or(Err(FetchError::Cancelled)),
        Err(_) => Err(FetchError::Cancelled),
    }
}
