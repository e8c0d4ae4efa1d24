//! Catalog fetch state and its scenario-list projection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_core::scenario::Scenario;

/// Lifecycle of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Nothing has been requested yet.
    Idle,
    /// A load is in flight.
    Loading,
    /// The last load succeeded.
    Ready,
    /// The last load failed on every path it tried.
    Failed,
}

/// The process-wide catalog as last committed by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFetchState {
    /// Current lifecycle status.
    pub status: CatalogStatus,
    /// Scenarios in server order.
    pub items: Arc<[Scenario]>,
    /// Human-readable failure message when `status` is `Failed`.
    pub error_message: Option<String>,
    /// When `items` were last replaced by a successful load.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Default for CatalogFetchState {
    fn default() -> Self {
        Self {
            status: CatalogStatus::Idle,
            items: Arc::from(Vec::new()),
            error_message: None,
            loaded_at: None,
        }
    }
}

impl CatalogFetchState {
    /// Projects the state onto what the scenario list should show.
    #[must_use]
    pub fn view(&self) -> CatalogView<'_> {
        match self.status {
            CatalogStatus::Idle => CatalogView::Idle,
            CatalogStatus::Loading => CatalogView::Loading,
            CatalogStatus::Failed => {
                CatalogView::Failed(self.error_message.as_deref().unwrap_or_default())
            }
            CatalogStatus::Ready if self.items.is_empty() => CatalogView::Empty,
            CatalogStatus::Ready => CatalogView::Ready(&self.items),
        }
    }
}

/// What the scenario list renders for a given fetch state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CatalogView<'a> {
    /// No load has been requested.
    Idle,
    /// Show a loading indicator.
    Loading,
    /// Show the failure message.
    Failed(&'a str),
    /// The catalog loaded and has no scenarios. Not an error.
    Empty,
    /// The catalog loaded with at least one scenario.
    Ready(&'a [Scenario]),
}
