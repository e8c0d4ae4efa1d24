//! Parley client: Catalog Loader.
//!
//! Fetches the scenario catalog through an authenticated primary request,
//! falls back to a credential-less request when the policy allows it, and
//! exposes the resulting fetch state. At most one load is in flight per
//! loader; overlapping callers share its outcome.

pub mod http;
pub mod loader;
pub mod state;

pub use http::{HttpCatalogConfig, HttpCatalogTransport};
pub use loader::{CatalogConfig, CatalogLoader, FallbackPolicy, FetchError, LoadOutcome};
pub use state::{CatalogFetchState, CatalogStatus, CatalogView};
