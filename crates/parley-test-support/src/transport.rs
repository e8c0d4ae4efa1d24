//! Test catalog transport: scripted responses per route.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::scenario::Scenario;
use parley_core::transport::{AttemptError, CatalogRoute, CatalogTransport};

type Scripted = Result<Vec<Scenario>, AttemptError>;

/// A catalog transport that replays scripted results and counts calls.
///
/// Each route has a queue of responses; the last queued response repeats
/// once the queue is down to one entry. An optional per-route delay is
/// applied with `tokio::time::sleep`, so tests on a paused runtime can make
/// calls overlap deterministically.
#[derive(Debug, Default)]
pub struct ScriptedCatalogTransport {
    responses: Mutex<HashMap<CatalogRoute, VecDeque<Scripted>>>,
    delays: Mutex<HashMap<CatalogRoute, Duration>>,
    calls: Mutex<Vec<CatalogRoute>>,
}

impl ScriptedCatalogTransport {
    /// Creates a transport with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the primary route.
    #[must_use]
    pub fn with_primary(self, response: Scripted) -> Self {
        self.push(CatalogRoute::Primary, response);
        self
    }

    /// Queues a response for the fallback route.
    #[must_use]
    pub fn with_fallback(self, response: Scripted) -> Self {
        self.push(CatalogRoute::Fallback, response);
        self
    }

    /// Delays every response on `route` by `delay`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_delay(self, route: CatalogRoute, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(route, delay);
        self
    }

    /// Queues a response for `route`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push(&self, route: CatalogRoute, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(route)
            .or_default()
            .push_back(response);
    }

    /// Returns the routes requested, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<CatalogRoute> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many times `route` was requested.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self, route: CatalogRoute) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| **r == route)
            .count()
    }

    fn next_response(&self, route: CatalogRoute) -> Scripted {
        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(&route) else {
            return Err(AttemptError::Network(format!("no scripted {route} response")));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(AttemptError::Network(format!("no scripted {route} response"))))
        }
    }
}

#[async_trait]
impl CatalogTransport for ScriptedCatalogTransport {
    async fn fetch(&self, route: CatalogRoute) -> Result<Vec<Scenario>, AttemptError> {
        self.calls.lock().unwrap().push(route);
        let delay = self.delays.lock().unwrap().get(&route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response(route)
    }
}
